use crate::config::{PlannerConfig, PLANNER_KEY};
use crate::models::{Envelope, Idea, IdeaDraft, RecordId, Tab, Win, WinDraft};
use crate::remote::PlannerTransport;
use crate::storage::{detect_mirror, Mirror};
use crate::store::{self, Record};
use crate::sync::SyncOrchestrator;
use crate::util::now_ms;
use leptos::prelude::*;
use leptos::task::spawn_local;
use std::collections::HashSet;
use std::rc::Rc;

pub(crate) type PlannerSync = SyncOrchestrator<Mirror, PlannerTransport>;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FormDraft {
    Idea(IdeaDraft),
    Win(WinDraft),
}

impl FormDraft {
    pub fn empty_for(tab: Tab) -> Self {
        match tab {
            Tab::Ideas => Self::Idea(IdeaDraft::default()),
            Tab::Wins => Self::Win(WinDraft::default()),
        }
    }

    pub fn title(&self) -> &str {
        match self {
            Self::Idea(d) => &d.title,
            Self::Win(d) => &d.title,
        }
    }
}

/// A text field of either form, addressed by name so inputs can share code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Field {
    Title,
    Notes,
    Blockers,
    Gaps,
    When,
    Impact,
    GrantUse,
}

impl FormDraft {
    fn slot(&mut self, field: Field) -> Option<&mut String> {
        match (self, field) {
            (Self::Idea(d), Field::Title) => Some(&mut d.title),
            (Self::Idea(d), Field::Notes) => Some(&mut d.notes),
            (Self::Idea(d), Field::Blockers) => Some(&mut d.blockers),
            (Self::Idea(d), Field::Gaps) => Some(&mut d.gaps),
            (Self::Win(d), Field::Title) => Some(&mut d.title),
            (Self::Win(d), Field::When) => Some(&mut d.when),
            (Self::Win(d), Field::Impact) => Some(&mut d.impact),
            (Self::Win(d), Field::GrantUse) => Some(&mut d.grant_use),
            _ => None,
        }
    }

    pub fn get(&self, field: Field) -> String {
        self.clone().slot(field).cloned().unwrap_or_default()
    }

    /// Fields that do not belong to this kind of record are ignored.
    pub fn set(&mut self, field: Field, value: String) {
        if let Some(slot) = self.slot(field) {
            *slot = value;
        }
    }
}

/// The add/edit dialog. `editing` is `None` when adding.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FormState {
    pub editing: Option<RecordId>,
    pub draft: FormDraft,
}

/// Reactive planner state shared with the view layer.
#[derive(Clone, Copy)]
pub(crate) struct PlannerState {
    pub ideas: RwSignal<Vec<Idea>>,
    pub wins: RwSignal<Vec<Win>>,
    pub tab: RwSignal<Tab>,

    /// Ideas whose blockers/gaps panel is open.
    pub expanded: RwSignal<HashSet<RecordId>>,
    pub form: RwSignal<Option<FormState>>,

    /// Set once the startup load finished; persistence is off until then.
    pub loaded: RwSignal<bool>,
}

impl PlannerState {
    pub fn new() -> Self {
        Self {
            ideas: RwSignal::new(vec![]),
            wins: RwSignal::new(vec![]),
            tab: RwSignal::new(Tab::default()),
            expanded: RwSignal::new(HashSet::new()),
            form: RwSignal::new(None),
            loaded: RwSignal::new(false),
        }
    }

    pub fn envelope_untracked(&self) -> Envelope {
        Envelope {
            ideas: self.ideas.get_untracked(),
            wins: self.wins.get_untracked(),
        }
    }

    /// Builds the sync orchestrator from `config`, kicks off the startup
    /// load and the outbox, and persists every change after loading.
    pub fn start(self, config: &PlannerConfig) {
        let mirror = detect_mirror();
        let transport = PlannerTransport::from_config(config);
        log::info!(
            "local mirror: {}; remote sync: {}",
            mirror.name(),
            if transport.is_some() { "on" } else { "off" }
        );

        let sync: Rc<PlannerSync> = Rc::new(SyncOrchestrator::new(
            PLANNER_KEY,
            mirror,
            transport,
            config.read_timeout,
            config.outbox_capacity,
        ));

        if let Some(task) = sync.take_outbox_task() {
            spawn_local(task);
        }

        let loader = sync.clone();
        spawn_local(async move {
            let (env, _report) = loader.load(self.envelope_untracked()).await;
            self.ideas.set(env.ideas);
            self.wins.set(env.wins);
            self.loaded.set(true);
        });

        Effect::new(move |_| {
            let ideas = self.ideas.get();
            let wins = self.wins.get();
            if !self.loaded.get() {
                return;
            }
            sync.persist(&Envelope { ideas, wins });
        });
    }

    pub fn switch_tab(&self, tab: Tab) {
        self.tab.set(tab);
    }

    pub fn open_add(&self) {
        self.form.set(Some(FormState {
            editing: None,
            draft: FormDraft::empty_for(self.tab.get_untracked()),
        }));
    }

    pub fn start_edit(&self, id: RecordId) {
        let draft = match self.tab.get_untracked() {
            Tab::Ideas => self.ideas.with_untracked(|v| {
                v.iter().find(|r| r.id == id).map(|r| FormDraft::Idea(r.to_draft()))
            }),
            Tab::Wins => self.wins.with_untracked(|v| {
                v.iter().find(|r| r.id == id).map(|r| FormDraft::Win(r.to_draft()))
            }),
        };

        if let Some(draft) = draft {
            self.form.set(Some(FormState {
                editing: Some(id),
                draft,
            }));
        }
    }

    pub fn edit_form(&self, f: impl FnOnce(&mut FormDraft)) {
        self.form.update(|form| {
            if let Some(form) = form {
                f(&mut form.draft);
            }
        });
    }

    pub fn close_form(&self) {
        self.form.set(None);
    }

    /// Applies the open form. A blank title keeps the form open and changes
    /// nothing.
    pub fn save_form(&self) -> bool {
        let Some(FormState { editing, draft }) = self.form.get_untracked() else {
            return false;
        };
        if draft.title().trim().is_empty() {
            return false;
        }

        let now = now_ms();
        let saved = match (draft, editing) {
            (FormDraft::Idea(d), Some(id)) => {
                let mut hit = false;
                self.ideas.maybe_update(|v| {
                    hit = store::update(v, id, d);
                    hit
                });
                hit
            }
            (FormDraft::Idea(d), None) => {
                let mut hit = false;
                self.ideas.maybe_update(|v| {
                    hit = store::add(v, d, now).is_some();
                    hit
                });
                hit
            }
            (FormDraft::Win(d), Some(id)) => {
                let mut hit = false;
                self.wins.maybe_update(|v| {
                    hit = store::update(v, id, d);
                    hit
                });
                hit
            }
            (FormDraft::Win(d), None) => {
                let mut hit = false;
                self.wins.maybe_update(|v| {
                    hit = store::add(v, d, now).is_some();
                    hit
                });
                hit
            }
        };

        self.form.set(None);
        saved
    }

    pub fn remove(&self, id: RecordId) {
        match self.tab.get_untracked() {
            Tab::Ideas => self.ideas.maybe_update(|v| store::remove(v, id)),
            Tab::Wins => self.wins.maybe_update(|v| store::remove(v, id)),
        }
    }

    pub fn toggle_expand(&self, id: RecordId) {
        self.expanded.update(|set| {
            if !set.remove(&id) {
                set.insert(id);
            }
        });
    }
}

impl Default for PlannerState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Clone, Copy)]
pub(crate) struct PlannerContext(pub PlannerState);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Status;

    fn with_state(f: impl FnOnce(PlannerState)) {
        let owner = Owner::new();
        owner.with(|| f(PlannerState::new()));
    }

    #[test]
    fn test_field_access_matches_record_kind() {
        let mut d = FormDraft::empty_for(Tab::Wins);
        d.set(Field::GrantUse, "capacity".to_string());
        d.set(Field::Notes, "ignored".to_string());
        assert_eq!(d.get(Field::GrantUse), "capacity");
        assert_eq!(d.get(Field::Notes), "");
        assert_eq!(
            d,
            FormDraft::Win(WinDraft {
                grant_use: "capacity".to_string(),
                ..Default::default()
            })
        );
    }

    #[test]
    fn test_add_goes_to_active_tab() {
        with_state(|s| {
            s.switch_tab(Tab::Wins);
            s.open_add();
            s.edit_form(|d| {
                if let FormDraft::Win(w) = d {
                    w.title = "Roof restored".to_string();
                }
            });
            assert!(s.save_form());
            assert_eq!(s.wins.get_untracked().len(), 1);
            assert!(s.ideas.get_untracked().is_empty());
            assert!(s.form.get_untracked().is_none());
        });
    }

    #[test]
    fn test_blank_title_keeps_form_open() {
        with_state(|s| {
            s.open_add();
            assert!(!s.save_form());
            assert!(s.form.get_untracked().is_some());
            assert!(s.ideas.get_untracked().is_empty());
        });
    }

    #[test]
    fn test_edit_replaces_fields_and_keeps_id() {
        with_state(|s| {
            s.open_add();
            s.edit_form(|d| {
                if let FormDraft::Idea(i) = d {
                    i.title = "Grant".to_string();
                }
            });
            s.save_form();
            let id = s.ideas.get_untracked()[0].id;

            s.start_edit(id);
            s.edit_form(|d| {
                if let FormDraft::Idea(i) = d {
                    i.status = Status::Active;
                    i.notes = "due in May".to_string();
                }
            });
            assert!(s.save_form());

            let ideas = s.ideas.get_untracked();
            assert_eq!(ideas.len(), 1);
            assert_eq!(ideas[0].id, id);
            assert_eq!(ideas[0].fields.status, Status::Active);
            assert_eq!(ideas[0].fields.title, "Grant");
        });
    }

    #[test]
    fn test_remove_and_expand_by_id() {
        with_state(|s| {
            s.ideas.set(vec![Idea::from_draft(
                RecordId(1),
                IdeaDraft {
                    title: "A".to_string(),
                    ..Default::default()
                },
            )]);

            s.toggle_expand(RecordId(1));
            assert!(s.expanded.get_untracked().contains(&RecordId(1)));
            s.toggle_expand(RecordId(1));
            assert!(s.expanded.get_untracked().is_empty());

            // Removing on the other tab does not touch ideas.
            s.switch_tab(Tab::Wins);
            s.remove(RecordId(1));
            assert_eq!(s.ideas.get_untracked().len(), 1);

            s.switch_tab(Tab::Ideas);
            s.remove(RecordId(1));
            assert!(s.ideas.get_untracked().is_empty());
        });
    }
}
