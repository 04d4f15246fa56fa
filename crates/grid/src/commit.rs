//! Commit-on-navigate.
//!
//! The coordinator sits between a grid view and the model that owns the
//! rows. When the cursor leaves a unit (cell, row or column, per the
//! configured granularity) the unit is committed first; a failed commit
//! flags the unit and vetoes the move. Closing an open cell editor may
//! itself change the row, so in that case the commit runs as a continuation
//! on the next event-loop turn and the original move is replayed afterwards.

use crate::config::Granularity;
use alloc::rc::{Rc, Weak};
use alloc::vec::Vec;
use core::cell::Cell;
use stagehand_reactive::CallQueue;

/// A cell position.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct Position {
    pub row: usize,
    pub col: usize,
}

impl Position {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }
}

/// What gets committed together.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Unit {
    Cell(Position),
    Row(usize),
    Column(usize),
    Table,
}

impl Unit {
    /// The unit containing `pos` under `granularity`.
    pub fn of(granularity: Granularity, pos: Position) -> Unit {
        match granularity {
            Granularity::Cell => Unit::Cell(pos),
            Granularity::Row => Unit::Row(pos.row),
            Granularity::Column => Unit::Column(pos.col),
            Granularity::Table => Unit::Table,
        }
    }
}

/// Visual state of a unit.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum UnitFlag {
    Clean,
    Error,
}

/// Answer to a cursor move request.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MoveOutcome {
    /// The view may move the cursor.
    Allowed,
    /// The commit failed; the cursor stays.
    Vetoed,
    /// The move was postponed until the cell editor is closed; the
    /// coordinator moves the cursor itself once the commit succeeds.
    Deferred,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommitState {
    Idle,
    EditingUnit(Unit),
    Committing(Unit),
}

/// Aggregate result of committing several units.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SaveReport {
    pub saved: usize,
    /// Rows whose commit failed.
    pub failed_rows: Vec<usize>,
}

impl SaveReport {
    #[inline]
    pub fn is_success(&self) -> bool {
        self.failed_rows.is_empty()
    }
}

/// The view side: cursor, cell editor and unit highlighting.
pub trait GridView {
    fn is_editor_open(&self) -> bool;

    /// Asks the editor to close. Its value may be stored on a later turn.
    fn close_editor(&self);

    fn set_cursor(&self, pos: Position);

    fn set_flag(&self, unit: Unit, flag: UnitFlag);
}

/// The model side: knows which units hold staged edits and how to save them.
pub trait CommitTarget {
    fn has_changes(&self, unit: Unit) -> bool;

    /// Saves every row of `unit`. Failures are reported by the target.
    fn commit(&self, unit: Unit) -> bool;

    /// Saves every row with staged edits.
    fn commit_all(&self) -> SaveReport;
}

/// Decides when staged edits are committed while the cursor moves.
pub struct CommitCoordinator {
    granularity: Granularity,
    target: Rc<dyn CommitTarget>,
    view: Rc<dyn GridView>,
    queue: Rc<CallQueue>,
    state: Cell<CommitState>,
    cursor: Cell<Position>,
    pending_move: Cell<Option<Position>>,
    this: Weak<CommitCoordinator>,
}

impl CommitCoordinator {
    pub fn new(
        granularity: Granularity,
        target: Rc<dyn CommitTarget>,
        view: Rc<dyn GridView>,
        queue: Rc<CallQueue>,
    ) -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            granularity,
            target,
            view,
            queue,
            state: Cell::new(CommitState::Idle),
            cursor: Cell::new(Position::default()),
            pending_move: Cell::new(None),
            this: this.clone(),
        })
    }

    #[inline]
    pub fn granularity(&self) -> Granularity {
        self.granularity
    }

    #[inline]
    pub fn state(&self) -> CommitState {
        self.state.get()
    }

    #[inline]
    pub fn cursor(&self) -> Position {
        self.cursor.get()
    }

    /// Returns true while a move waits for the editor to close.
    pub fn has_pending_move(&self) -> bool {
        self.pending_move.get().is_some()
    }

    /// Marks the unit under the cursor as being edited.
    pub fn begin_edit(&self) {
        let unit = Unit::of(self.granularity, self.cursor.get());
        self.state.set(CommitState::EditingUnit(unit));
    }

    /// Handles a request to move the cursor to `to`.
    pub fn request_move(&self, to: Position) -> MoveOutcome {
        if self.pending_move.get().is_some() {
            self.pending_move.set(Some(to));
            return MoveOutcome::Deferred;
        }

        let from = self.cursor.get();
        let leaving = Unit::of(self.granularity, from);
        if !self.granularity.is_automatic() || leaving == Unit::of(self.granularity, to) {
            self.cursor.set(to);
            return MoveOutcome::Allowed;
        }

        if self.view.is_editor_open() {
            self.view.close_editor();
            self.pending_move.set(Some(to));
            let this = self.this.clone();
            self.queue.call_after(move || {
                if let Some(this) = this.upgrade() {
                    this.resume();
                }
            });
            tracing::debug!(?from, ?to, "move deferred until editor closes");
            return MoveOutcome::Deferred;
        }

        if self.commit_unit(leaving) {
            self.cursor.set(to);
            tracing::debug!(?from, ?to, "cursor moved");
            MoveOutcome::Allowed
        } else {
            tracing::warn!(?from, ?to, unit = ?leaving, "move vetoed, commit failed");
            MoveOutcome::Vetoed
        }
    }

    /// Replays a deferred move.
    fn resume(&self) {
        let Some(to) = self.pending_move.take() else {
            return;
        };
        if self.request_move(to) == MoveOutcome::Allowed {
            self.view.set_cursor(to);
        }
    }

    fn commit_unit(&self, unit: Unit) -> bool {
        if !self.target.has_changes(unit) {
            self.view.set_flag(unit, UnitFlag::Clean);
            self.state.set(CommitState::Idle);
            return true;
        }

        self.state.set(CommitState::Committing(unit));
        let ok = self.target.commit(unit);
        if ok {
            self.view.set_flag(unit, UnitFlag::Clean);
            self.state.set(CommitState::Idle);
        } else {
            self.view.set_flag(unit, UnitFlag::Error);
            self.state.set(CommitState::EditingUnit(unit));
        }
        ok
    }

    /// Commits every dirty row regardless of granularity and flags failures.
    pub fn commit_all(&self) -> SaveReport {
        self.state.set(CommitState::Committing(Unit::Table));
        let report = self.target.commit_all();
        for &row in &report.failed_rows {
            self.view.set_flag(Unit::Row(row), UnitFlag::Error);
        }
        self.state.set(CommitState::Idle);
        tracing::debug!(
            saved = report.saved,
            failed = report.failed_rows.len(),
            "commit all"
        );
        report
    }
}
