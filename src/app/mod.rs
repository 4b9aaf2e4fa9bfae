use crate::config::PlannerConfig;
use crate::models::{Idea, IdeaDraft, RecordId, Status, Tab, Win, WinDraft};
use crate::state::{Field, FormDraft, PlannerContext, PlannerState};
use leptos::prelude::*;
use std::str::FromStr;
use strum::IntoEnumIterator;

const BTN_OUTLINE: &str =
    "rounded-sm border px-2.5 py-1 text-[11px] hover:cursor-pointer hover:bg-[#f5efe6]";
const TAB: &str = "border-b-[3px] px-6 py-3.5 text-[13px] hover:cursor-pointer";
const INPUT: &str = "w-full rounded border border-[#e0d8cc] bg-white px-2.5 py-2 text-sm outline-none focus:border-[#c9a96e]";

fn status_class(status: Status) -> &'static str {
    match status {
        Status::Exploring => "text-[#2c5f8a] bg-[#e8f0f7]",
        Status::Active => "text-[#4a7c59] bg-[#edf5f0]",
        Status::OnHold => "text-[#888] bg-[#f5f5f5]",
        Status::NotAFit => "text-[#b05a2f] bg-[#fdf0ea]",
        Status::Complete => "text-[#886c44] bg-[#f5efe6]",
    }
}

fn planner() -> PlannerState {
    expect_context::<PlannerContext>().0
}

#[component]
pub fn App(config: PlannerConfig) -> impl IntoView {
    let state = PlannerState::new();
    provide_context(PlannerContext(state));
    state.start(&config);

    view! {
        <div class="min-h-screen bg-[#fdfbf8] font-serif text-[#2d2a26]">
            <header class="bg-[#886c44] px-7 py-4">
                <div class="text-[10px] uppercase tracking-[3px] text-white/80">"North Star House"</div>
                <div class="text-lg text-white">"Organizational Focus Planner"</div>
            </header>
            <TabBar />
            <main class="mx-auto max-w-3xl px-5 py-7">
                <TabIntro />
                <RecordList />
            </main>
            <RecordForm />
        </div>
    }
}

#[component]
fn TabBar() -> impl IntoView {
    let state = planner();

    let tab_button = move |tab: Tab, label: &'static str| {
        let count = move || match tab {
            Tab::Ideas => state.ideas.with(|v| v.len()),
            Tab::Wins => state.wins.with(|v| v.len()),
        };
        view! {
            <button
                class=move || {
                    if state.tab.get() == tab {
                        format!("{TAB} border-[#886c44] text-[#886c44]")
                    } else {
                        format!("{TAB} border-transparent text-[#999]")
                    }
                }
                on:click=move |_| state.switch_tab(tab)
            >
                {label}
                <Show when=move || { count() > 0 }>
                    <span class="ml-2 rounded-full bg-[#f5efe6] px-2 py-px text-[10px] text-[#886c44]">
                        {count}
                    </span>
                </Show>
            </button>
        }
    };

    view! {
        <nav class="flex border-b border-[#e8e0d4] bg-white">
            {tab_button(Tab::Ideas, "Ideas & Initiatives")}
            {tab_button(Tab::Wins, "Accomplishments")}
        </nav>
    }
}

#[component]
fn TabIntro() -> impl IntoView {
    let state = planner();

    let blurb = move || match state.tab.get() {
        Tab::Ideas => "Grants, programs, projects, and anything you're considering - with space to note what's blocking or missing.",
        Tab::Wins => "Things you've done, built, or achieved. Useful for grant writing, board reports, and telling your story.",
    };

    view! {
        <div class="mb-6 flex items-start justify-between gap-5">
            <div class="text-[13px] text-[#aaa]">{blurb}</div>
            <button
                class="shrink-0 whitespace-nowrap rounded bg-[#886c44] px-4 py-2 text-xs tracking-wide text-white hover:cursor-pointer"
                on:click=move |_| state.open_add()
            >
                "+ Add"
            </button>
        </div>
    }
}

#[component]
fn RecordList() -> impl IntoView {
    let state = planner();

    let empty = move || match state.tab.get() {
        Tab::Ideas => state.ideas.with(|v| v.is_empty()),
        Tab::Wins => state.wins.with(|v| v.is_empty()),
    };

    view! {
        <Show when=empty>
            <div class="px-5 py-16 text-center text-[13px] text-[#ccc]">
                "Nothing here yet - hit " <strong>"+ Add"</strong> " to get started."
            </div>
        </Show>
        <div class="flex flex-col gap-2.5">
            {move || match state.tab.get() {
                Tab::Ideas => state
                    .ideas
                    .get()
                    .into_iter()
                    .map(|idea| view! { <IdeaCard idea=idea /> })
                    .collect_view()
                    .into_any(),
                Tab::Wins => state
                    .wins
                    .get()
                    .into_iter()
                    .map(|win| view! { <WinCard win=win /> })
                    .collect_view()
                    .into_any(),
            }}
        </div>
    }
}

#[component]
fn Tag(tone: &'static str, children: Children) -> impl IntoView {
    view! {
        <span class=format!("rounded-sm px-2 py-0.5 text-[10px] tracking-wide {tone}")>
            {children()}
        </span>
    }
}

#[component]
fn Labelled(label: &'static str, text: String) -> impl IntoView {
    view! {
        <div class="mt-1.5 text-xs leading-relaxed text-[#777]">
            <span class="text-[10px] uppercase tracking-widest text-[#bbb]">{label} " "</span>
            {text}
        </div>
    }
}

#[component]
fn RowActions(id: RecordId, #[prop(default = None)] toggle: Option<AnyView>) -> impl IntoView {
    let state = planner();
    view! {
        <div class="flex shrink-0 items-center gap-1.5">
            {toggle}
            <button
                class=format!("{BTN_OUTLINE} border-[#886c44]/30 text-[#886c44]")
                on:click=move |_| state.start_edit(id)
            >
                "Edit"
            </button>
            <button
                class=format!("{BTN_OUTLINE} border-[#b05a2f]/30 text-[#b05a2f]")
                on:click=move |_| state.remove(id)
            >
                "X"
            </button>
        </div>
    }
}

#[component]
fn IdeaCard(idea: Idea) -> impl IntoView {
    let state = planner();
    let id = idea.id;
    let IdeaDraft {
        title,
        status,
        notes,
        blockers,
        gaps,
    } = idea.fields;

    let open = move || state.expanded.with(|set| set.contains(&id));
    let has_extra = !blockers.is_empty() || !gaps.is_empty();

    let toggle = has_extra.then(|| {
        view! {
            <button
                class=format!("{BTN_OUTLINE} border-[#e0d8cc] text-[#aaa]")
                on:click=move |_| state.toggle_expand(id)
            >
                {move || if open() { "Less" } else { "More" }}
            </button>
        }
        .into_any()
    });

    let details = move || {
        open().then(|| {
            view! {
                <div class="flex flex-col gap-2.5 border-t border-[#f0e8de] bg-[#fdfaf7] px-4 py-3.5">
                    {(!blockers.is_empty()).then(|| view! {
                        <div>
                            <div class="mb-1 text-[10px] uppercase tracking-widest text-[#b05a2f]">"Blockers"</div>
                            <div class="text-xs leading-relaxed text-[#777]">{blockers.clone()}</div>
                        </div>
                    })}
                    {(!gaps.is_empty()).then(|| view! {
                        <div>
                            <div class="mb-1 text-[10px] uppercase tracking-widest text-[#2c5f8a]">"Gaps"</div>
                            <div class="text-xs leading-relaxed text-[#777]">{gaps.clone()}</div>
                        </div>
                    })}
                </div>
            }
        })
    };

    view! {
        <div class="overflow-hidden rounded-md border border-l-4 border-[#e8e0d4] border-l-[#c9a96e] bg-white">
            <div class="flex items-start gap-3 px-4 py-3.5">
                <div class="flex-1">
                    <div class="mb-1.5 text-sm">{title}</div>
                    <div class="flex flex-wrap gap-1.5">
                        <Tag tone=status_class(status)>{status.to_string()}</Tag>
                    </div>
                    {(!notes.is_empty()).then(|| view! {
                        <div class="mt-2 text-xs leading-relaxed text-[#777]">{notes}</div>
                    })}
                </div>
                <RowActions id=id toggle=toggle />
            </div>
            {details}
        </div>
    }
}

#[component]
fn WinCard(win: Win) -> impl IntoView {
    let id = win.id;
    let WinDraft {
        title,
        when,
        impact,
        grant_use,
    } = win.fields;

    view! {
        <div class="overflow-hidden rounded-md border border-l-4 border-[#e8e0d4] border-l-[#c9a96e] bg-white">
            <div class="flex items-start gap-3 px-4 py-3.5">
                <div class="flex-1">
                    <div class="mb-1.5 text-sm">{title}</div>
                    {(!when.is_empty()).then(|| view! {
                        <div class="flex flex-wrap gap-1.5">
                            <Tag tone="text-[#888] bg-[#f5f5f5]">{when}</Tag>
                        </div>
                    })}
                    {(!impact.is_empty()).then(|| view! { <Labelled label="Impact" text=impact /> })}
                    {(!grant_use.is_empty()).then(|| view! { <Labelled label="For grant writing" text=grant_use /> })}
                </div>
                <RowActions id=id />
            </div>
        </div>
    }
}

/// Inputs write straight into the open draft; they are seeded once when the
/// dialog opens so typing does not re-render them.
fn draft_value(state: PlannerState, field: Field) -> String {
    state
        .form
        .with_untracked(|f| f.as_ref().map(|f| f.draft.get(field)))
        .unwrap_or_default()
}

#[component]
fn TextField(
    field: Field,
    label: &'static str,
    placeholder: &'static str,
    /// Renders a textarea with this many rows instead of a single-line input.
    #[prop(optional)]
    rows: Option<u32>,
) -> impl IntoView {
    let state = planner();
    let initial = draft_value(state, field);
    let on_input = move |ev: web_sys::Event| {
        let value = event_target_value(&ev);
        state.edit_form(|d| d.set(field, value));
    };

    let control = match rows {
        Some(rows) => view! {
            <textarea
                class=format!("{INPUT} resize-y")
                rows=rows.to_string()
                placeholder=placeholder
                prop:value=initial
                on:input=on_input
            ></textarea>
        }
        .into_any(),
        None => view! {
            <input class=INPUT type="text" placeholder=placeholder prop:value=initial on:input=on_input />
        }
        .into_any(),
    };

    view! {
        <div class="mb-3.5">
            <label class="mb-1 block text-[11px] uppercase tracking-widest text-[#888]">{label}</label>
            {control}
        </div>
    }
}

#[component]
fn StatusField() -> impl IntoView {
    let state = planner();
    let initial = state.form.with_untracked(|f| match f {
        Some(crate::state::FormState {
            draft: FormDraft::Idea(d),
            ..
        }) => d.status,
        _ => Status::default(),
    });

    let on_change = move |ev: web_sys::Event| {
        let status = Status::from_str(&event_target_value(&ev)).unwrap_or_default();
        state.edit_form(|d| {
            if let FormDraft::Idea(idea) = d {
                idea.status = status;
            }
        });
    };

    view! {
        <div class="mb-3.5">
            <label class="mb-1 block text-[11px] uppercase tracking-widest text-[#888]">"Status"</label>
            <select class=INPUT on:change=on_change>
                {Status::iter()
                    .map(|s| view! {
                        <option value=s.to_string() selected=s == initial>{s.to_string()}</option>
                    })
                    .collect_view()}
            </select>
        </div>
    }
}

#[component]
fn RecordForm() -> impl IntoView {
    let state = planner();

    // Only re-render when the dialog opens, closes or switches record;
    // keystrokes update the draft without touching this.
    let shape = Memo::new(move |_| {
        state.form.with(|f| {
            f.as_ref()
                .map(|f| (f.editing, matches!(f.draft, FormDraft::Idea(_))))
        })
    });

    let dialog = move || {
        shape.get().map(|(editing, is_idea)| {
            let heading = format!(
                "{} - {}",
                if editing.is_some() { "Edit" } else { "Add" },
                if is_idea { "Idea or Initiative" } else { "Accomplishment" }
            );

            let fields = if is_idea {
                view! {
                    <TextField field=Field::Title label="Title" placeholder="e.g. Apply for CAC grant, Launch youth program" />
                    <StatusField />
                    <TextField field=Field::Notes label="Notes - why it matters, context, ideas" placeholder="Background, rationale, opportunity..." rows=3 />
                    <TextField field=Field::Blockers label="Blockers - what's in the way" placeholder="Capacity, funding, decisions needed, timing..." rows=2 />
                    <TextField field=Field::Gaps label="Gaps - what's missing" placeholder="Skills, documentation, relationships, resources..." rows=2 />
                }
                .into_any()
            } else {
                view! {
                    <TextField field=Field::Title label="What was accomplished" placeholder="e.g. Completed roof restoration, Launched volunteer portal" />
                    <TextField field=Field::When label="When" placeholder="e.g. Fall 2024, January 2025" />
                    <TextField field=Field::Impact label="Why it mattered" placeholder="Community impact, org capacity, historic preservation..." rows=3 />
                    <TextField field=Field::GrantUse label="How to use this in grant writing" placeholder="Proof of capacity, demonstrated need, organizational health..." rows=2 />
                }
                .into_any()
            };

            view! {
                <div class="fixed inset-0 z-50 flex items-center justify-center bg-black/35 p-4">
                    <div class="max-h-[90vh] w-[520px] max-w-full overflow-y-auto rounded-lg bg-white p-7 shadow-xl">
                        <div class="mb-5 text-[15px] text-[#886c44]">{heading}</div>
                        {fields}
                        <div class="mt-4 flex justify-end gap-2.5">
                            <button
                                class="rounded border border-[#e0d8cc] px-4 py-2 text-[13px] text-[#888] hover:cursor-pointer"
                                on:click=move |_| state.close_form()
                            >
                                "Cancel"
                            </button>
                            <button
                                class="rounded bg-[#886c44] px-5 py-2 text-[13px] text-white hover:cursor-pointer"
                                on:click=move |_| {
                                    state.save_form();
                                }
                            >
                                "Save"
                            </button>
                        </div>
                    </div>
                </div>
            }
        })
    };

    view! { {dialog} }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_status_has_its_own_colors() {
        let classes: std::collections::HashSet<_> = Status::iter().map(status_class).collect();
        assert_eq!(classes.len(), Status::iter().count());
    }
}
