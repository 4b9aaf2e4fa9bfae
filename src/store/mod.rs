use crate::models::{Idea, IdeaDraft, RecordId, Win, WinDraft};

/// A record kind stored in one of the two planner collections.
pub trait Record: Clone {
    type Draft: Clone + Default;

    fn id(&self) -> RecordId;
    fn title(&self) -> &str;
    fn from_draft(id: RecordId, draft: Self::Draft) -> Self;
    fn to_draft(&self) -> Self::Draft;
}

impl Record for Idea {
    type Draft = IdeaDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn title(&self) -> &str {
        &self.fields.title
    }

    fn from_draft(id: RecordId, draft: IdeaDraft) -> Self {
        Self { id, fields: draft }
    }

    fn to_draft(&self) -> IdeaDraft {
        self.fields.clone()
    }
}

impl Record for Win {
    type Draft = WinDraft;

    fn id(&self) -> RecordId {
        self.id
    }

    fn title(&self) -> &str {
        &self.fields.title
    }

    fn from_draft(id: RecordId, draft: WinDraft) -> Self {
        Self { id, fields: draft }
    }

    fn to_draft(&self) -> WinDraft {
        self.fields.clone()
    }
}

pub trait DraftTitle {
    fn draft_title(&self) -> &str;
}

impl DraftTitle for IdeaDraft {
    fn draft_title(&self) -> &str {
        &self.title
    }
}

impl DraftTitle for WinDraft {
    fn draft_title(&self) -> &str {
        &self.title
    }
}

/// Timestamp-based id, bumped past anything already in the collection so a
/// burst of adds within one millisecond still gets distinct ids.
pub fn next_id<R: Record>(items: &[R], now_ms: i64) -> RecordId {
    let max = items.iter().map(|r| r.id().0).max();
    match max {
        Some(m) if m >= now_ms => RecordId(m.saturating_add(1)),
        _ => RecordId(now_ms),
    }
}

/// Appends a record built from `draft`. Whitespace-only titles are rejected.
pub fn add<R>(items: &mut Vec<R>, draft: R::Draft, now_ms: i64) -> Option<RecordId>
where
    R: Record,
    R::Draft: DraftTitle,
{
    if draft.draft_title().trim().is_empty() {
        return None;
    }

    let id = next_id(items, now_ms);
    items.push(R::from_draft(id, draft));
    Some(id)
}

/// Replaces every field of the matching record except its id.
pub fn update<R>(items: &mut [R], id: RecordId, draft: R::Draft) -> bool
where
    R: Record,
    R::Draft: DraftTitle,
{
    if draft.draft_title().trim().is_empty() {
        return false;
    }

    let Some(slot) = items.iter_mut().find(|r| r.id() == id) else {
        return false;
    };
    *slot = R::from_draft(id, draft);
    true
}

pub fn remove<R: Record>(items: &mut Vec<R>, id: RecordId) -> bool {
    let before = items.len();
    items.retain(|r| r.id() != id);
    items.len() != before
}
