use std::{collections::HashMap, time::Duration};

use anyhow::{anyhow, Result};
use log::{error, info, warn};
use wasm_bindgen::{closure::Closure, prelude::*, JsCast};
use web_sys::{window, Event, EventTarget, HtmlElement, KeyboardEvent, Window};

use crate::config::{FieldConfig, Tuning};
use crate::game::Game;
use crate::render;
use crate::session::Session;
use crate::state::Phase;
use crate::timer::{Scheduler, Task};

/// `window.setInterval` backed timers.
///
/// A cancelled interval's closure may still be on the stack (a tick that
/// ends the run cancels itself), so it is parked and only freed on the next
/// registration.
pub struct IntervalScheduler {
    window: Window,
    active: HashMap<i32, Closure<dyn FnMut()>>,
    retired: Vec<Closure<dyn FnMut()>>,
}

impl IntervalScheduler {
    pub fn new() -> Result<Self> {
        let window = window().ok_or_else(|| anyhow!("No window"))?;
        Ok(Self {
            window,
            active: HashMap::new(),
            retired: Vec::new(),
        })
    }
}

impl Scheduler for IntervalScheduler {
    type Handle = i32;

    fn schedule_periodic(&mut self, interval: Duration, task: Task) -> Result<i32> {
        self.retired.clear();
        let closure = Closure::wrap(task);
        let millis = i32::try_from(interval.as_millis()).unwrap_or(i32::MAX);
        let handle = self
            .window
            .set_interval_with_callback_and_timeout_and_arguments_0(
                closure.as_ref().unchecked_ref(),
                millis,
            )
            .map_err(|err| anyhow!("setInterval failed: {err:?}"))?;
        self.active.insert(handle, closure);
        Ok(handle)
    }

    fn cancel(&mut self, handle: i32) {
        self.window.clear_interval_with_handle(handle);
        if let Some(closure) = self.active.remove(&handle) {
            self.retired.push(closure);
        }
    }
}

struct Listener {
    target: EventTarget,
    kind: &'static str,
    closure: Closure<dyn FnMut(Event)>,
}

/// JavaScript handle around a timer-driven game session.
#[wasm_bindgen]
pub struct WebGame {
    session: Session<IntervalScheduler>,
    window: Window,
    listeners: Vec<Listener>,
    trigger: Option<Closure<dyn FnMut()>>,
}

#[wasm_bindgen]
impl WebGame {
    /// Builds a game from a query string, defaulting to the page's own
    /// `location.search`. Invalid configuration falls back to defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(query: Option<String>) -> Result<WebGame, JsValue> {
        let window = window().ok_or_else(|| JsValue::from_str("No window"))?;
        let query = match query {
            Some(query) => query,
            None => window.location().search().unwrap_or_default(),
        };
        let tuning = Tuning::default();
        let config = load_config(&query, &tuning);
        info!(
            "field {}x{} ({:?})",
            config.field_width, config.field_height, config.sizing
        );

        let scheduler = IntervalScheduler::new().map_err(to_js)?;
        let session = Session::new(Game::new(config), scheduler);
        Ok(WebGame {
            session,
            window,
            listeners: Vec::new(),
            trigger: None,
        })
    }

    /// Start, restart or jump, depending on the phase.
    pub fn activate(&self) -> Result<(), JsValue> {
        self.session.activate().map(|_| ()).map_err(to_js)
    }

    /// Takes effect at the next start. Throws if the field is too small to
    /// play in; the previous size is kept.
    pub fn resize(&self, width: f32, height: f32) -> Result<(), JsValue> {
        self.session.resize(width, height).map_err(to_js)
    }

    pub fn phase(&self) -> String {
        match self.session.phase() {
            Phase::NotStarted => "not_started",
            Phase::Running => "running",
            Phase::Over => "over",
        }
        .to_string()
    }

    pub fn score(&self) -> u32 {
        self.session.score()
    }

    pub fn high_score(&self) -> u32 {
        self.session.high_score()
    }

    pub fn bird_y(&self) -> f32 {
        self.session.snapshot().bird.y
    }

    /// Packed `InstanceData` records: position, size (f32 x4) and kind (u32).
    pub fn instance_bytes(&self) -> Vec<u8> {
        render::as_bytes(&self.session.instances()).to_vec()
    }

    /// Maps Space / ArrowUp, mouse down and touch start to `activate`, and
    /// exposes `window.triggerJump()`.
    pub fn bind_input(&mut self, element: &HtmlElement) -> Result<(), JsValue> {
        self.unbind_input();
        let window_target = EventTarget::from(self.window.clone());
        let element_target = EventTarget::from(element.clone());

        let key = self.activate_on(|event| match event.dyn_ref::<KeyboardEvent>() {
            Some(key) if !key.repeat() && matches!(key.code().as_str(), "Space" | "ArrowUp") => {
                key.prevent_default();
                true
            }
            _ => false,
        });
        self.listen(window_target, "keydown", key)?;

        let mouse = self.activate_on(|_| true);
        self.listen(element_target.clone(), "mousedown", mouse)?;

        let touch = self.activate_on(|event| {
            event.prevent_default();
            true
        });
        self.listen(element_target, "touchstart", touch)?;

        let session = self.session.clone();
        let trigger = Closure::wrap(Box::new(move || {
            if let Err(err) = session.activate() {
                error!("activate failed: {err:#}");
            }
        }) as Box<dyn FnMut()>);
        js_sys::Reflect::set(
            &self.window,
            &JsValue::from_str("triggerJump"),
            trigger.as_ref().unchecked_ref(),
        )?;
        self.trigger = Some(trigger);
        Ok(())
    }

    /// Stops the timers and removes every listener. Safe to call twice.
    pub fn destroy(&mut self) {
        self.unbind_input();
        self.session.shutdown();
    }
}

impl WebGame {
    fn activate_on(
        &self,
        accept: impl Fn(&Event) -> bool + 'static,
    ) -> Closure<dyn FnMut(Event)> {
        let session = self.session.clone();
        Closure::wrap(Box::new(move |event: Event| {
            if !accept(&event) {
                return;
            }
            if let Err(err) = session.activate() {
                error!("activate failed: {err:#}");
            }
        }) as Box<dyn FnMut(Event)>)
    }

    fn listen(
        &mut self,
        target: EventTarget,
        kind: &'static str,
        closure: Closure<dyn FnMut(Event)>,
    ) -> Result<(), JsValue> {
        target.add_event_listener_with_callback(kind, closure.as_ref().unchecked_ref())?;
        self.listeners.push(Listener {
            target,
            kind,
            closure,
        });
        Ok(())
    }

    fn unbind_input(&mut self) {
        for listener in self.listeners.drain(..) {
            if let Err(err) = listener.target.remove_event_listener_with_callback(
                listener.kind,
                listener.closure.as_ref().unchecked_ref(),
            ) {
                warn!("failed to remove {} listener: {err:?}", listener.kind);
            }
        }
        if self.trigger.take().is_some() {
            let key = JsValue::from_str("triggerJump");
            if let Err(err) = js_sys::Reflect::delete_property(self.window.as_ref(), &key) {
                warn!("failed to remove triggerJump: {err:?}");
            }
        }
    }
}

impl Drop for WebGame {
    fn drop(&mut self) {
        self.destroy();
    }
}

fn load_config(query: &str, tuning: &Tuning) -> FieldConfig {
    let loaded = FieldConfig::from_query(query).and_then(|config| {
        config.validate(tuning)?;
        Ok(config)
    });
    match loaded {
        Ok(config) => config,
        Err(err) => {
            warn!("ignoring field configuration: {err:#}");
            FieldConfig::default()
        }
    }
}

fn to_js(err: anyhow::Error) -> JsValue {
    JsValue::from_str(&format!("{err:#}"))
}
