//! # Table State Module
//!
//! Loaded rows of one list screen plus the bookkeeping that keeps them
//! consistent while fetches and local edits interleave.
//!
//! ## Responsibilities:
//! - Local mutation reconciler (`add_item`, `update_item`, `delete_item`)
//! - Pagination state (cursor, has-more, loading, last error)
//! - Fetch tickets: every request is numbered and tagged with the query
//!   generation it was issued for, so superseded responses are discarded
//! - Mutation journal: edits made while a fetch is in flight are replayed on
//!   top of the page when it lands
//!
//! ## Ordering rules:
//! A response is applied only if its generation is current and it is not
//! older than the latest reset fetch. Next-page fetches are sequential: a
//! new one is refused while any fetch is loading.

use serde_json::Value;
use shared::{Identified, Page, RowId};
use std::collections::HashSet;
use tracing::debug;

/// Local edit made by a create/edit/delete dialog after the server confirmed it.
#[derive(Debug, Clone, PartialEq)]
pub enum Mutation {
    Add(Value),
    Update(Value),
    Delete(RowId),
}

/// Insert `item` at the front. If a row with the same id is already loaded,
/// it is replaced in place instead so ids stay unique.
pub fn add_item(rows: &mut Vec<Value>, item: Value) {
    if let Some(id) = item.row_id() {
        if let Some(existing) = rows.iter_mut().find(|r| r.row_id().as_ref() == Some(&id)) {
            *existing = item;
            return;
        }
    }
    rows.insert(0, item);
}

/// Replace the row with `item`'s id. Absent ids are a no-op.
pub fn update_item(rows: &mut [Value], item: Value) -> bool {
    let Some(id) = item.row_id() else {
        return false;
    };
    match rows.iter_mut().find(|r| r.row_id().as_ref() == Some(&id)) {
        Some(existing) => {
            *existing = item;
            true
        }
        None => false,
    }
}

/// Remove the row with `id`. Absent ids are a no-op.
pub fn delete_item(rows: &mut Vec<Value>, id: &RowId) -> bool {
    let before = rows.len();
    rows.retain(|r| r.row_id().as_ref() != Some(id));
    rows.len() != before
}

fn apply(rows: &mut Vec<Value>, mutation: Mutation) -> bool {
    match mutation {
        Mutation::Add(item) => {
            add_item(rows, item);
            true
        }
        Mutation::Update(item) => update_item(rows, item),
        Mutation::Delete(id) => delete_item(rows, &id),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    /// First page of the current query; replaces the rows.
    Reset,
    /// Following page; appended to the rows.
    NextPage,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket {
    pub id: u64,
    pub generation: u64,
    pub page: u32,
    pub kind: FetchKind,
    journal_mark: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    Applied,
    Failed,
    /// Superseded by a newer query or reset; nothing changed.
    Discarded,
}

#[derive(Debug)]
pub struct TableState {
    rows: Vec<Value>,
    next_cursor: Option<u32>,
    has_more: bool,
    is_loading: bool,
    initial_load_complete: bool,
    error: Option<String>,

    generation: u64,
    next_ticket: u64,
    latest_reset: u64,
    in_flight: HashSet<u64>,

    journal: Vec<(u64, Mutation)>,
    mutation_seq: u64,
}

impl Default for TableState {
    fn default() -> Self {
        Self::new()
    }
}

impl TableState {
    pub fn new() -> Self {
        Self {
            rows: Vec::new(),
            next_cursor: None,
            has_more: false,
            is_loading: false,
            initial_load_complete: false,
            error: None,
            generation: 0,
            next_ticket: 1,
            latest_reset: 0,
            in_flight: HashSet::new(),
            journal: Vec::new(),
            mutation_seq: 0,
        }
    }

    pub fn rows(&self) -> &[Value] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn is_loading(&self) -> bool {
        self.is_loading
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn initial_load_complete(&self) -> bool {
        self.initial_load_complete
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn pending_mutations(&self) -> usize {
        self.journal.len()
    }

    /// The query changed: every fetch issued so far is now stale.
    pub fn bump_generation(&mut self) -> u64 {
        self.generation += 1;
        self.generation
    }

    /// Check if the next page may be requested.
    pub fn can_load_more(&self) -> bool {
        self.has_more && !self.is_loading && self.next_cursor.is_some()
    }

    fn issue(&mut self, kind: FetchKind, page: u32) -> FetchTicket {
        let ticket = FetchTicket {
            id: self.next_ticket,
            generation: self.generation,
            page,
            kind,
            journal_mark: self.mutation_seq,
        };
        self.next_ticket += 1;
        self.in_flight.insert(ticket.id);
        self.is_loading = true;
        self.error = None;
        ticket
    }

    /// Ticket for page 1 of the current query.
    pub fn begin_reset(&mut self) -> FetchTicket {
        let ticket = self.issue(FetchKind::Reset, 1);
        self.latest_reset = ticket.id;
        ticket
    }

    /// Ticket for the next page, or `None` when there is none or a fetch is
    /// already loading.
    pub fn begin_next_page(&mut self) -> Option<FetchTicket> {
        if !self.can_load_more() {
            return None;
        }
        let page = self.next_cursor?;
        Some(self.issue(FetchKind::NextPage, page))
    }

    fn is_current(&self, ticket: &FetchTicket) -> bool {
        ticket.generation == self.generation && ticket.id >= self.latest_reset
    }

    fn settle(&mut self, ticket: &FetchTicket) {
        self.in_flight.remove(&ticket.id);
        if self.in_flight.is_empty() {
            self.journal.clear();
        }
    }

    /// Land the result of a fetch.
    pub fn complete(&mut self, ticket: FetchTicket, result: Result<Page, String>) -> FetchOutcome {
        if !self.is_current(&ticket) {
            debug!(
                component = "table",
                ticket = ticket.id,
                generation = ticket.generation,
                current_generation = self.generation,
                "Discarding superseded response"
            );
            self.settle(&ticket);
            return FetchOutcome::Discarded;
        }

        self.is_loading = false;
        let outcome = match result {
            Ok(page) => {
                self.next_cursor = page.next_cursor;
                self.has_more = page.next_cursor.is_some();
                self.initial_load_complete = true;
                self.error = None;
                match ticket.kind {
                    FetchKind::Reset => self.land_reset(page.items, ticket.journal_mark),
                    FetchKind::NextPage => self.land_next_page(page.items, ticket.journal_mark),
                }
                FetchOutcome::Applied
            }
            Err(error) => {
                self.error = Some(error);
                FetchOutcome::Failed
            }
        };
        self.settle(&ticket);
        outcome
    }

    /// A fetch was dropped before it answered.
    pub fn abandon(&mut self, ticket: FetchTicket) {
        if self.is_current(&ticket) {
            self.is_loading = false;
        }
        self.settle(&ticket);
    }

    fn replayable(&self, mark: u64) -> impl Iterator<Item = &Mutation> {
        self.journal
            .iter()
            .filter(move |(seq, _)| *seq > mark)
            .map(|(_, m)| m)
    }

    fn land_reset(&mut self, mut items: Vec<Value>, mark: u64) {
        let replay: Vec<Mutation> = self.replayable(mark).cloned().collect();
        if !replay.is_empty() {
            debug!(component = "table", count = replay.len(), "Replaying local edits");
        }
        for mutation in replay {
            apply(&mut items, mutation);
        }
        self.rows = items;
    }

    fn land_next_page(&mut self, mut items: Vec<Value>, mark: u64) {
        let replay: Vec<Mutation> = self.replayable(mark).cloned().collect();
        for mutation in replay {
            match mutation {
                Mutation::Update(item) => {
                    update_item(&mut items, item);
                }
                Mutation::Delete(id) => {
                    delete_item(&mut items, &id);
                }
                // Added rows are already at the front.
                Mutation::Add(_) => {}
            }
        }

        // Filter out rows already loaded (page boundaries shift after adds)
        let existing_ids: HashSet<RowId> = self.rows.iter().filter_map(Value::row_id).collect();
        self.rows.extend(
            items
                .into_iter()
                .filter(|item| item.row_id().map_or(true, |id| !existing_ids.contains(&id))),
        );
    }

    /// Apply a confirmed local edit. Journaled while any fetch is in flight.
    pub fn mutate(&mut self, mutation: Mutation) -> bool {
        if !self.in_flight.is_empty() {
            self.mutation_seq += 1;
            self.journal.push((self.mutation_seq, mutation.clone()));
        }
        apply(&mut self.rows, mutation)
    }
}
