pub mod colors;
pub mod config;
pub mod data;
pub mod layout;
pub mod payload;
pub mod ranking;
pub mod render;
pub mod session;
pub mod storage;
pub mod submit;

use config::FormConfig;
use data::{fetch_advisors, fetch_config};
use gloo_timers::callback::Timeout;
use layout::{sync_row_heights, Coalescer};
use log::{error, warn};
use payload::{FormField, Payload};
use render::RowView;
use session::FormSession;
use std::cell::RefCell;
use std::rc::Rc;
use storage::LocalStorageBackend;
use submit::{download_csv, post_form, SubmitError, SubmitGate};
use wasm_bindgen::prelude::{wasm_bindgen, Closure};
use wasm_bindgen::JsCast;
use wasm_bindgen_futures::spawn_local;
use web_sys::{window, HtmlInputElement};
use yew::prelude::*;

const ROW_SELECTOR: &str = "#advisor-table tbody tr";
const LOADING_GUIDANCE: &str = "Loading advisors…";
const READY_GUIDANCE: &str =
    "Drag rows to rank your preferences. Left column shows the choice numbers.";
const LOAD_FAILED_GUIDANCE: &str = "Could not load advisors. Please reload the page.";
const SUBMITTING_MESSAGE: &str = "Submitting your rankings…";
const SUCCESS_MESSAGE: &str = "Thanks! Your rankings were sent successfully.";
const FAILURE_MESSAGE: &str =
    "Your CSV was saved locally, but the online submission failed. Please try again.";

type BrowserSession = FormSession<LocalStorageBackend>;

#[derive(Default)]
struct PageState {
    config: FormConfig,
    gate: SubmitGate,
    session: Option<BrowserSession>,
}

#[derive(Clone, PartialEq)]
enum FormStatus {
    Idle,
    Pending(String),
    Success(String),
    Error(String),
}

#[function_component(App)]
fn app() -> Html {
    let page = use_mut_ref(PageState::default);
    let resize = use_mut_ref(Coalescer::<Timeout>::default);
    let flash = use_mut_ref(Coalescer::<Timeout>::default);
    let drag_from = use_mut_ref(|| None::<usize>);
    let force_update = use_force_update();

    let guidance = use_state(|| LOADING_GUIDANCE.to_owned());
    let form_status = use_state(|| FormStatus::Idle);
    let flashed = use_state(|| None::<String>);
    let name_ref = use_node_ref();
    let email_ref = use_node_ref();

    let debounce_ms = page.borrow().config.resize_debounce_ms;
    let flash_ms = page.borrow().config.flash_ms;

    {
        let page = page.clone();
        let guidance = guidance.clone();
        let force_update = force_update.clone();

        use_effect_with_deps(
            move |_| {
                spawn_local(async move {
                    let config = fetch_config().await;
                    page.borrow_mut().config = config.clone();
                    let loaded = match fetch_advisors(&config).await {
                        Ok(candidates) => {
                            let mut rng = rand::thread_rng();
                            FormSession::start(config, candidates, LocalStorageBackend, &mut rng)
                                .map_err(|err| err.to_string())
                        }
                        Err(err) => Err(err.to_string()),
                    };

                    {
                        let mut state = page.borrow_mut();
                        match loaded {
                            Ok(session) => {
                                state.session = Some(session);
                                state.gate.load_finished(true);
                                guidance.set(READY_GUIDANCE.to_owned());
                            }
                            Err(message) => {
                                error!("Could not load advisors: {}", message);
                                state.gate.load_finished(false);
                                guidance.set(LOAD_FAILED_GUIDANCE.to_owned());
                            }
                        }
                    }
                    force_update.force_update();
                });

                || ()
            },
            (),
        );
    }

    {
        let resize = resize.clone();
        use_effect_with_deps(
            move |_| {
                let listener = {
                    let resize = resize.clone();
                    Closure::wrap(Box::new(move || schedule_row_sync(&resize, debounce_ms))
                        as Box<dyn FnMut()>)
                };
                let win = window();
                if let Some(win) = &win {
                    let _ = win.add_event_listener_with_callback(
                        "resize",
                        listener.as_ref().unchecked_ref(),
                    );
                }

                move || {
                    if let Some(win) = win {
                        let _ = win.remove_event_listener_with_callback(
                            "resize",
                            listener.as_ref().unchecked_ref(),
                        );
                    }
                }
            },
            (),
        );
    }

    {
        let resize = resize.clone();
        use_effect(move || {
            schedule_row_sync(&resize, debounce_ms);
            || ()
        });
    }

    let on_reorder = {
        let page = page.clone();
        let flash = flash.clone();
        let flashed = flashed.clone();
        let force_update = force_update.clone();

        Callback::from(move |(from, to): (usize, usize)| {
            let moved = {
                let mut state = page.borrow_mut();
                let Some(session) = state.session.as_mut() else {
                    return;
                };
                session.move_row(from, to)
            };

            match moved {
                Ok(name) => flash_row(&flash, &flashed, name, flash_ms),
                Err(err) => warn!("Ignoring drop: {}", err),
            }
            force_update.force_update();
        })
    };

    let on_email_input = {
        let email_ref = email_ref.clone();
        Callback::from(move |_: InputEvent| {
            if let Some(input) = email_ref.cast::<HtmlInputElement>() {
                input.set_custom_validity("");
            }
        })
    };

    let on_submit = {
        let page = page.clone();
        let form_status = form_status.clone();
        let force_update = force_update.clone();
        let name_ref = name_ref.clone();
        let email_ref = email_ref.clone();

        Callback::from(move |event: SubmitEvent| {
            event.prevent_default();

            let name = input_value(&name_ref);
            let email = input_value(&email_ref);
            let started = begin_submission(&mut page.borrow_mut(), &name, &email);

            let (payload, endpoint) = match started {
                Ok(started) => started,
                Err(err) => {
                    if matches!(err, SubmitError::MissingEmail | SubmitError::InvalidEmail(_)) {
                        if let Some(input) = email_ref.cast::<HtmlInputElement>() {
                            input.set_custom_validity(&err.to_string());
                            input.report_validity();
                        }
                    }
                    form_status.set(FormStatus::Error(err.to_string()));
                    return;
                }
            };

            if let Err(err) = download_csv(&payload.csv, &payload.file_name) {
                error!("Could not export rankings: {}", err);
            }
            form_status.set(FormStatus::Pending(SUBMITTING_MESSAGE.to_owned()));
            force_update.force_update();

            let page = page.clone();
            let form_status = form_status.clone();
            let force_update = force_update.clone();
            let name_ref = name_ref.clone();
            let email_ref = email_ref.clone();

            spawn_local(async move {
                let result = post_form(&endpoint, &payload.fields).await;

                {
                    let mut state = page.borrow_mut();
                    state.gate.finish_submit();
                    if let Some(session) = state.session.as_mut() {
                        session.finish_submission(result.is_ok());
                    }
                }

                match result {
                    Ok(()) => {
                        clear_input(&name_ref);
                        clear_input(&email_ref);
                        form_status.set(FormStatus::Success(SUCCESS_MESSAGE.to_owned()));
                    }
                    Err(err) => {
                        error!("Submission failed: {}", err);
                        form_status.set(FormStatus::Error(FAILURE_MESSAGE.to_owned()));
                    }
                }
                force_update.force_update();
            });
        })
    };

    let (rows, pending, submit_enabled) = {
        let state = page.borrow();
        match &state.session {
            Some(session) => (
                session.rows().to_vec(),
                session.pending_fields().to_vec(),
                state.gate.is_enabled(),
            ),
            None => (Vec::new(), Vec::new(), false),
        }
    };

    html! {
        <div class="advisor-app">
            <section class="choices__table">
                <p class="table-guidance">{ (*guidance).clone() }</p>
                <div class="table-wrapper">
                    <table id="advisor-table">
                        <thead>
                            <tr>
                                <th>{ "Choice" }</th>
                                <th>{ "Advisor" }</th>
                                <th>{ "Capacity" }</th>
                                <th>{ "Methods" }</th>
                            </tr>
                        </thead>
                        <tbody>
                            { for rows.iter().enumerate().map(|(index, row)| {
                                let is_flashed = flashed.as_deref() == Some(row.name.as_str());
                                render_row(row, index, is_flashed, &drag_from, &on_reorder)
                            }) }
                        </tbody>
                    </table>
                </div>
            </section>

            <form id="advisor-form" onsubmit={on_submit}>
                <label for="full-name">{ "Full name" }</label>
                <input id="full-name" name="Name" type="text" required={true} ref={name_ref} />
                <label for="email">{ "Email" }</label>
                <input id="email" name="Email" type="email" required={true}
                    ref={email_ref} oninput={on_email_input} />
                <div id="choice-fields">
                    { for pending.iter().map(render_hidden_field) }
                </div>
                <button type="submit" disabled={!submit_enabled}>{ "Submit rankings" }</button>
                { render_status(&form_status) }
            </form>
        </div>
    }
}

fn render_row(
    row: &RowView,
    index: usize,
    is_flashed: bool,
    drag_from: &Rc<RefCell<Option<usize>>>,
    on_reorder: &Callback<(usize, usize)>,
) -> Html {
    let on_drag_start = {
        let drag_from = drag_from.clone();
        let name = row.name.clone();
        Callback::from(move |event: DragEvent| {
            *drag_from.borrow_mut() = Some(index);
            if let Some(transfer) = event.data_transfer() {
                let _ = transfer.set_data("text/plain", &name);
            }
        })
    };

    let on_drag_over = Callback::from(|event: DragEvent| event.prevent_default());

    let on_drop = {
        let drag_from = drag_from.clone();
        let on_reorder = on_reorder.clone();
        Callback::from(move |event: DragEvent| {
            event.prevent_default();
            if let Some(from) = drag_from.borrow_mut().take() {
                on_reorder.emit((from, index));
            }
        })
    };

    let on_drag_end = {
        let drag_from = drag_from.clone();
        Callback::from(move |_: DragEvent| {
            drag_from.borrow_mut().take();
        })
    };

    let tags = if row.tags.is_empty() {
        html! { "—" }
    } else {
        html! {
            <>
                { for row.tags.iter().map(|pill| html! {
                    <span class="tag" style={format!("background-color: {}", pill.color)}>
                        { pill.label.clone() }
                    </span>
                }) }
            </>
        }
    };

    html! {
        <tr key={row.name.clone()}
            class={classes!("advisor-row", is_flashed.then_some("reordered"))}
            draggable="true"
            data-name={row.name.clone()}
            ondragstart={on_drag_start}
            ondragover={on_drag_over}
            ondrop={on_drop}
            ondragend={on_drag_end}>
            <td class="rank-cell">{ row.rank.to_string() }</td>
            <td>{ row.name.clone() }</td>
            <td>{ row.capacity_label().to_owned() }</td>
            <td>{ tags }</td>
        </tr>
    }
}

fn render_hidden_field(field: &FormField) -> Html {
    html! {
        <input type="hidden" name={field.name.clone()} value={field.value.clone()} />
    }
}

fn render_status(status: &FormStatus) -> Html {
    let (message, variant) = match status {
        FormStatus::Idle => return html! { <p id="form-status" class="form-status"></p> },
        FormStatus::Pending(message) => (message, None),
        FormStatus::Success(message) => (message, Some("form-status--success")),
        FormStatus::Error(message) => (message, Some("form-status--error")),
    };

    html! {
        <p id="form-status" class={classes!("form-status", variant)}>{ message.clone() }</p>
    }
}

fn begin_submission(
    state: &mut PageState,
    name: &str,
    email: &str,
) -> Result<(Payload, String), SubmitError> {
    state.gate.check_ready()?;
    let session = state.session.as_ref().ok_or(SubmitError::NotReady)?;
    let payload = session.prepare_submission(name, email)?;
    let endpoint = session.config().submit_endpoint.clone();
    state.gate.begin_submit()?;
    Ok((payload, endpoint))
}

fn schedule_row_sync(resize: &Rc<RefCell<Coalescer<Timeout>>>, delay_ms: u32) {
    let handle = resize.clone();
    resize.borrow_mut().schedule(move |generation| {
        Timeout::new(delay_ms, move || {
            if handle.borrow_mut().settle(generation) {
                sync_row_heights(ROW_SELECTOR);
            }
        })
    });
}

/// Highlights `name`. A newer flash cancels the older one's clear.
fn flash_row(
    flash: &Rc<RefCell<Coalescer<Timeout>>>,
    flashed: &UseStateHandle<Option<String>>,
    name: String,
    duration_ms: u32,
) {
    flashed.set(Some(name));
    let handle = flash.clone();
    let flashed = flashed.clone();
    flash.borrow_mut().schedule(move |generation| {
        Timeout::new(duration_ms, move || {
            if handle.borrow_mut().settle(generation) {
                flashed.set(None);
            }
        })
    });
}

fn input_value(node: &NodeRef) -> String {
    node.cast::<HtmlInputElement>()
        .map(|input| input.value())
        .unwrap_or_default()
}

fn clear_input(node: &NodeRef) {
    if let Some(input) = node.cast::<HtmlInputElement>() {
        input.set_value("");
    }
}

#[wasm_bindgen(start)]
pub fn run_app() {
    wasm_logger::init(wasm_logger::Config::default());
    yew::Renderer::<App>::new().render();
}
