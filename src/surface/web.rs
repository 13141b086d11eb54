// Browser glue for the iron house.
// Builds the DOM inside a host container, forwards clicks and animation
// frames into `FractureSurface`, and renders what it reports. Everything is
// owned by the returned `IronHouseHandle`; dropping or unmounting it cancels
// the frame loop and detaches every listener.

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::f64::consts::TAU;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    CanvasRenderingContext2d, Document, Element, Event, HtmlCanvasElement, HtmlElement, MouseEvent,
    window,
};

use super::{FractureSurface, Frame, Strike, narrative};
use crate::config::SurfaceConfig;
use crate::rng::Lcg;

const KEYFRAMES: &str = "\
@keyframes ih-fade-in-up { from { opacity: 0; translate: 0 16px; } to { opacity: 1; translate: 0 0; } }\
@keyframes ih-scale-in { from { opacity: 0; scale: 0.9; } to { opacity: 1; scale: 1; } }\
@keyframes ih-pulse { 50% { opacity: 0.35; } }";

struct View {
    root: HtmlElement,
    dawn: HtmlElement,
    frame: HtmlElement,
    canvas: HtmlCanvasElement,
    ctx: CanvasRenderingContext2d,
    heading: HtmlElement,
    hint: HtmlElement,
    overlay: HtmlElement,
    progress: HtmlElement,
    progress_fill: HtmlElement,
    reveal: HtmlElement,
    // Shard elements in the same order as the surface's shard ring.
    shard_nodes: VecDeque<(u64, HtmlElement)>,
    shaken: bool,
}

struct Session {
    surface: FractureSurface<Lcg>,
    view: View,
    on_break: Option<js_sys::Function>,
    on_engage: Option<js_sys::Function>,
}

type Shared = Rc<RefCell<Session>>;
type FrameCallback = Rc<RefCell<Option<Closure<dyn FnMut(f64)>>>>;

/// Handle to a mounted iron house. Call `unmount()` (or `free()`) to stop it.
#[wasm_bindgen]
pub struct IronHouseHandle {
    session: Shared,
    frame_cb: FrameCallback,
    raf_id: Rc<Cell<Option<i32>>>,
    root: HtmlElement,
    frame: HtmlElement,
    click: Option<Closure<dyn FnMut(MouseEvent)>>,
    resize: Option<Closure<dyn FnMut(Event)>>,
}

#[wasm_bindgen]
impl IronHouseHandle {
    pub fn hits(&self) -> u32 {
        self.session.try_borrow().map(|s| s.surface.hits()).unwrap_or(0)
    }

    /// One of `idle`, `accumulating`, `breaking`, `revealed`.
    pub fn state(&self) -> String {
        self.session
            .try_borrow()
            .map(|s| s.surface.state().as_str())
            .unwrap_or("busy")
            .to_owned()
    }

    pub fn unmount(self) {
        drop(self);
    }
}

impl IronHouseHandle {
    fn teardown(&mut self) {
        if let Some(id) = self.raf_id.take() {
            if let Some(w) = window() {
                let _ = w.cancel_animation_frame(id);
            }
        }
        // Breaks the closure's self-reference; the next frame sees `None` and stops.
        if let Ok(mut cb) = self.frame_cb.try_borrow_mut() {
            cb.take();
        }
        let owed = match self.session.try_borrow_mut() {
            Ok(mut s) => s.surface.teardown().map(|due| (due, s.on_break.clone())),
            Err(_) => None,
        };
        // A break already under way still completes after its delay.
        if let Some((due, Some(cb))) = owed {
            schedule_break(cb, due - now_ms());
        }
        if let Some(click) = self.click.take() {
            let _ = self
                .frame
                .remove_event_listener_with_callback("click", click.as_ref().unchecked_ref());
        }
        if let Some(resize) = self.resize.take() {
            if let Some(w) = window() {
                let _ = w
                    .remove_event_listener_with_callback("resize", resize.as_ref().unchecked_ref());
            }
        }
        self.root.remove();
        tracing::info!("iron house unmounted");
    }
}

fn schedule_break(cb: js_sys::Function, delay_ms: f64) {
    let Some(w) = window() else {
        return;
    };
    let timeout = delay_ms.clamp(0.0, i32::MAX as f64) as i32;
    let fire = Closure::once_into_js(move || {
        if let Err(e) = cb.call0(&JsValue::NULL) {
            tracing::warn!("on_break callback threw: {:?}", e);
        }
    });
    if let Err(e) =
        w.set_timeout_with_callback_and_timeout_and_arguments_0(fire.unchecked_ref(), timeout)
    {
        tracing::warn!("failed to schedule on_break: {:?}", e);
    }
}

impl Drop for IronHouseHandle {
    fn drop(&mut self) {
        if self.click.is_some() || self.resize.is_some() {
            self.teardown();
        }
    }
}

/// Mount the iron house into the element with id `container_id`.
///
/// `on_break` fires once, after the break delay, when the threshold is reached.
/// `on_engage` fires on the first strike. `config_json` is an optional partial
/// `SurfaceConfig` object.
#[wasm_bindgen]
pub fn mount_iron_house(
    container_id: &str,
    on_break: Option<js_sys::Function>,
    on_engage: Option<js_sys::Function>,
    config_json: Option<String>,
) -> Result<IronHouseHandle, JsValue> {
    let config = match config_json.as_deref() {
        Some(json) => {
            SurfaceConfig::from_json(json).map_err(|e| JsValue::from_str(&e.to_string()))?
        }
        None => SurfaceConfig::default(),
    };
    let win = window().ok_or_else(|| JsValue::from_str("no window"))?;
    let doc = win
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let container = doc
        .get_element_by_id(container_id)
        .ok_or_else(|| JsValue::from_str(&format!("no element with id {container_id}")))?;

    let view = build_view(&doc, &container)?;
    let (width, height) = fit_canvas(&view);
    let threshold = config.threshold;
    let surface = match FractureSurface::new(config, Lcg::from_entropy(), width, height) {
        Ok(surface) => surface,
        Err(e) => {
            view.root.remove();
            return Err(JsValue::from_str(&e.to_string()));
        }
    };

    let root = view.root.clone();
    let frame = view.frame.clone();
    let session: Shared = Rc::new(RefCell::new(Session {
        surface,
        view,
        on_break,
        on_engage,
    }));

    let click = {
        let session = session.clone();
        Closure::wrap(Box::new(move |evt: MouseEvent| on_click(&session, &evt))
            as Box<dyn FnMut(MouseEvent)>)
    };
    frame.add_event_listener_with_callback("click", click.as_ref().unchecked_ref())?;

    let resize = {
        let session = session.clone();
        Closure::wrap(Box::new(move |_evt: Event| on_resize(&session)) as Box<dyn FnMut(Event)>)
    };
    win.add_event_listener_with_callback("resize", resize.as_ref().unchecked_ref())?;

    let raf_id = Rc::new(Cell::new(None));
    let frame_cb = start_loop(&session, &raf_id);

    tracing::info!(container_id, threshold, width, height, "iron house mounted");
    Ok(IronHouseHandle {
        session,
        frame_cb,
        raf_id,
        root,
        frame,
        click: Some(click),
        resize: Some(resize),
    })
}

// --- DOM construction --------------------------------------------------------

fn element(doc: &Document, tag: &str, style: &str) -> Result<HtmlElement, JsValue> {
    let el: HtmlElement = doc.create_element(tag)?.dyn_into()?;
    el.set_attribute("style", style)?;
    Ok(el)
}

fn text(doc: &Document, tag: &str, style: &str, content: &str) -> Result<HtmlElement, JsValue> {
    let el = element(doc, tag, style)?;
    el.set_text_content(Some(content));
    Ok(el)
}

fn build_view(doc: &Document, container: &Element) -> Result<View, JsValue> {
    let root = element(
        doc,
        "div",
        "position:relative; width:100%; height:100%; background:#000; overflow:hidden; user-select:none; cursor:crosshair; display:flex; align-items:center; justify-content:center;",
    )?;
    root.set_attribute("data-iron-house", "root")?;
    let keyframes = doc.create_element("style")?;
    keyframes.set_text_content(Some(KEYFRAMES));
    root.append_child(&keyframes)?;

    let dawn = element(
        doc,
        "div",
        "position:absolute; inset:0; background:linear-gradient(to bottom,#ffedd5,#7dd3fc); opacity:0; transition:opacity 2000ms; z-index:0;",
    )?;
    root.append_child(&dawn)?;

    let column = element(
        doc,
        "div",
        "position:relative; z-index:10; width:100%; height:100%; padding:0 16px; box-sizing:border-box; display:flex; flex-direction:column; align-items:center; justify-content:center;",
    )?;
    root.append_child(&column)?;

    let frame = element(
        doc,
        "div",
        "position:relative; width:100%; max-width:768px; aspect-ratio:16/9; background:#0a0a0a; border:8px solid #171717; box-shadow:0 25px 50px -12px rgba(0,0,0,0.8); display:flex; align-items:center; justify-content:center; transition:transform 1000ms, opacity 1000ms;",
    )?;
    frame.set_attribute("data-iron-house", "frame")?;
    column.append_child(&frame)?;

    let texture = element(
        doc,
        "div",
        "position:absolute; inset:0; opacity:0.3; pointer-events:none; background-image:radial-gradient(circle,#333 1px,transparent 1px); background-size:20px 20px;",
    )?;
    frame.append_child(&texture)?;

    let canvas: HtmlCanvasElement = doc.create_element("canvas")?.dyn_into()?;
    canvas.set_attribute(
        "style",
        "position:absolute; inset:0; width:100%; height:100%; pointer-events:none; z-index:20; mix-blend-mode:screen;",
    )?;
    frame.append_child(&canvas)?;
    let ctx: CanvasRenderingContext2d = canvas
        .get_context("2d")?
        .ok_or_else(|| JsValue::from_str("no 2d context"))?
        .dyn_into()?;

    let content = element(doc, "div", "position:relative; z-index:30; text-align:center; padding:0 16px; pointer-events:none;")?;
    let heading = text(
        doc,
        "h3",
        "margin:0; font-size:clamp(36px,6vw,60px); font-weight:900; color:#262626; letter-spacing:-0.05em;",
        narrative::IDLE_HEADING,
    )?;
    let hint = text(
        doc,
        "p",
        "margin-top:16px; color:#404040; font-family:monospace; font-size:14px; animation:ih-pulse 2s infinite;",
        narrative::IDLE_HINT,
    )?;
    content.append_child(&heading)?;
    content.append_child(&hint)?;
    frame.append_child(&content)?;

    let overlay = element(
        doc,
        "div",
        "position:absolute; inset:0; z-index:40; display:none; align-items:center; justify-content:center; pointer-events:none; padding:32px;",
    )?;
    frame.append_child(&overlay)?;

    let progress = element(
        doc,
        "div",
        "margin-top:32px; width:100%; max-width:448px; height:4px; background:#171717; border-radius:9999px; overflow:hidden; visibility:hidden;",
    )?;
    let progress_fill = element(doc, "div", "height:100%; width:0%; background:#dc2626; transition:width 100ms ease-out;")?;
    progress.append_child(&progress_fill)?;
    column.append_child(&progress)?;

    let reveal = build_reveal(doc)?;
    root.append_child(&reveal)?;

    container.append_child(&root)?;
    Ok(View {
        root,
        dawn,
        frame,
        canvas,
        ctx,
        heading,
        hint,
        overlay,
        progress,
        progress_fill,
        reveal,
        shard_nodes: VecDeque::new(),
        shaken: false,
    })
}

fn build_reveal(doc: &Document) -> Result<HtmlElement, JsValue> {
    let reveal = element(
        doc,
        "div",
        "position:absolute; inset:0; z-index:50; display:none; flex-direction:column; align-items:center; justify-content:center; text-align:center; animation:ih-scale-in 800ms ease-out;",
    )?;
    let sun = text(
        doc,
        "div",
        "font-size:96px; color:#ea580c; margin-bottom:40px; text-shadow:0 0 80px rgba(251,146,60,0.8);",
        "☀",
    )?;
    let title = text(
        doc,
        "h2",
        "margin:0 0 32px; font-size:clamp(60px,9vw,96px); font-weight:900; color:#0f172a; letter-spacing:-0.05em;",
        narrative::REVEAL_HEADING,
    )?;
    let quote = text(
        doc,
        "p",
        "max-width:768px; padding:0 32px; font-size:clamp(24px,3.5vw,36px); font-family:serif; font-weight:700; color:#1e293b;",
        &format!("\u{201c}{}\u{201d}", narrative::REVEAL_QUOTE),
    )?;
    let rule = element(doc, "div", "height:4px; width:80px; background:#0f172a; margin:32px auto;")?;
    let coda = text(doc, "p", "font-size:20px; color:#334155; letter-spacing:0.05em;", narrative::REVEAL_CODA)?;
    for child in [&sun, &title, &quote, &rule, &coda] {
        reveal.append_child(child)?;
    }
    Ok(reveal)
}

fn fit_canvas(view: &View) -> (f64, f64) {
    let width = view.frame.client_width().max(0) as u32;
    let height = view.frame.client_height().max(0) as u32;
    view.canvas.set_width(width);
    view.canvas.set_height(height);
    (width as f64, height as f64)
}

fn set_style(el: &HtmlElement, prop: &str, value: &str) {
    let _ = el.style().set_property(prop, value);
}

// --- Input -------------------------------------------------------------------

fn now_ms() -> f64 {
    window()
        .and_then(|w| w.performance())
        .map(|p| p.now())
        .unwrap_or(0.0)
}

fn on_click(session: &Shared, evt: &MouseEvent) {
    let now = now_ms();
    let engage_cb = {
        let Ok(mut guard) = session.try_borrow_mut() else {
            return;
        };
        let s = &mut *guard;
        let rect = s.view.frame.get_bounding_client_rect();
        let x = evt.client_x() as f64 - rect.left();
        let y = evt.client_y() as f64 - rect.top();
        let Some(strike) = s.surface.strike(x, y, now) else {
            return;
        };
        if let Err(e) = render_strike(s, &strike) {
            tracing::warn!("failed to render strike: {:?}", e);
        }
        vibrate(&s.surface.config().vibrate_pattern);
        if strike.engaged { s.on_engage.clone() } else { None }
    };
    if let Some(cb) = engage_cb {
        if let Err(e) = cb.call0(&JsValue::NULL) {
            tracing::warn!("on_engage callback threw: {:?}", e);
        }
    }
}

fn on_resize(session: &Shared) {
    if let Ok(mut guard) = session.try_borrow_mut() {
        let s = &mut *guard;
        let (width, height) = fit_canvas(&s.view);
        s.surface.resize(width, height);
    }
}

fn vibrate(pattern: &[u32]) {
    let Some(nav) = window().map(|w| w.navigator()) else {
        return;
    };
    // Not every browser ships the Vibration API.
    if !js_sys::Reflect::has(&nav, &JsValue::from_str("vibrate")).unwrap_or(false) {
        return;
    }
    let arr: js_sys::Array = pattern.iter().map(|&ms| JsValue::from(ms)).collect();
    nav.vibrate_with_pattern(&arr);
}

fn render_strike(s: &mut Session, strike: &Strike) -> Result<(), JsValue> {
    let view = &mut s.view;
    let doc = view
        .root
        .owner_document()
        .ok_or_else(|| JsValue::from_str("detached view"))?;

    if let Some(evicted) = strike.evicted_shard {
        if let Some(pos) = view.shard_nodes.iter().position(|(id, _)| *id == evicted) {
            if let Some((_, node)) = view.shard_nodes.remove(pos) {
                node.remove();
            }
        }
    }
    if let Some(shard) = s.surface.shards().last() {
        let node = element(
            &doc,
            "div",
            "position:absolute; inset:0; z-index:15; pointer-events:none; background:linear-gradient(135deg,#2a2a2a,#050505); transition:transform 900ms cubic-bezier(0.2,0.7,0.3,1), opacity 900ms;",
        )?;
        set_style(&node, "clip-path", &shard.clip_path());
        view.frame.append_child(&node)?;
        view.shard_nodes.push_back((shard.id, node));
    }

    view.heading
        .set_text_content(Some(narrative::heading(strike.hits)));
    set_style(&view.hint, "display", "none");
    set_style(&view.progress, "visibility", "visible");
    set_style(
        &view.progress_fill,
        "width",
        &format!("{:.1}%", s.surface.progress() * 100.0),
    );

    if strike.stage_changed {
        if let Some(dialogue) = s.surface.dialogue() {
            mount_dialogue(&doc, &view.overlay, dialogue)?;
        }
    }

    if strike.broke {
        set_style(&view.overlay, "display", "none");
        set_style(&view.progress, "visibility", "hidden");
        for (shard, (_, node)) in s.surface.shards().zip(view.shard_nodes.iter()) {
            set_style(node, "transform", &shard.exit_transform());
            set_style(node, "opacity", "0");
        }
        set_style(&view.frame, "transform", "scale(1.1)");
        set_style(&view.frame, "opacity", "0");
        set_style(&view.frame, "pointer-events", "none");
    }
    Ok(())
}

fn mount_dialogue(
    doc: &Document,
    overlay: &HtmlElement,
    dialogue: &narrative::Dialogue,
) -> Result<(), JsValue> {
    // Rebuilding the nodes restarts the entrance animation.
    overlay.set_inner_html("");
    let column = element(doc, "div", "display:flex; flex-direction:column; gap:32px; width:100%; max-width:672px;")?;

    let quote_card = element(
        doc,
        "div",
        "align-self:flex-start; background:rgba(0,0,0,0.9); padding:24px; border-left:4px solid #fff; transform:rotate(-1deg); animation:ih-fade-in-up 600ms ease-out both;",
    )?;
    let quote = text(
        doc,
        "p",
        "margin:0; font-family:serif; font-size:clamp(22px,3vw,30px); color:#fff; line-height:1.6;",
        &format!("\u{201c}{}\u{201d}", dialogue.quote),
    )?;
    quote_card.append_child(&quote)?;

    let reality_card = element(
        doc,
        "div",
        "align-self:flex-end; background:rgba(69,10,10,0.9); padding:24px; border-right:4px solid #ef4444; transform:rotate(1deg); animation:ih-fade-in-up 600ms ease-out 200ms both;",
    )?;
    let reality = text(
        doc,
        "p",
        "margin:0; font-weight:700; font-size:clamp(18px,2.5vw,24px); color:#fecaca;",
        dialogue.reality,
    )?;
    reality_card.append_child(&reality)?;

    column.append_child(&quote_card)?;
    column.append_child(&reality_card)?;
    overlay.append_child(&column)?;
    set_style(overlay, "display", "flex");
    Ok(())
}

// --- Frame loop --------------------------------------------------------------

fn request_frame(cb: &Closure<dyn FnMut(f64)>, raf_id: &Cell<Option<i32>>) {
    if let Some(w) = window() {
        match w.request_animation_frame(cb.as_ref().unchecked_ref()) {
            Ok(id) => raf_id.set(Some(id)),
            Err(e) => tracing::warn!("requestAnimationFrame failed: {:?}", e),
        }
    }
}

fn start_loop(session: &Shared, raf_id: &Rc<Cell<Option<i32>>>) -> FrameCallback {
    let f: FrameCallback = Rc::new(RefCell::new(None));
    let g = f.clone();
    let session = session.clone();
    let raf = raf_id.clone();
    *g.borrow_mut() = Some(Closure::wrap(Box::new(move |ts: f64| {
        raf.set(None);
        if !run_frame(&session, ts) {
            return;
        }
        // `None` once the handle has been torn down (possibly by a host callback).
        if let Some(cb) = f.borrow().as_ref() {
            request_frame(cb, &raf);
        }
    }) as Box<dyn FnMut(f64)>));
    if let Some(cb) = g.borrow().as_ref() {
        request_frame(cb, raf_id);
    }
    g
}

/// Returns false once the surface has stopped.
fn run_frame(session: &Shared, now: f64) -> bool {
    let break_cb = {
        let Ok(mut guard) = session.try_borrow_mut() else {
            return true;
        };
        let s = &mut *guard;
        let revealed = match s.surface.tick(now) {
            Frame::Stopped => return false,
            Frame::Running { revealed } => revealed,
        };
        apply_shake(s, now);
        draw(s);
        if revealed {
            show_reveal(&s.view);
            s.on_break.clone()
        } else {
            None
        }
    };
    if let Some(cb) = break_cb {
        if let Err(e) = cb.call0(&JsValue::NULL) {
            tracing::warn!("on_break callback threw: {:?}", e);
        }
    }
    true
}

fn apply_shake(s: &mut Session, now: f64) {
    if !s.surface.state().accepts_input() {
        return;
    }
    let (dx, dy) = s.surface.shake_offset(now);
    if dx != 0.0 || dy != 0.0 {
        set_style(&s.view.frame, "transform", &format!("translate({dx:.1}px, {dy:.1}px)"));
        s.view.shaken = true;
    } else if s.view.shaken {
        set_style(&s.view.frame, "transform", "none");
        s.view.shaken = false;
    }
}

fn draw(s: &Session) {
    let ctx = &s.view.ctx;
    let w = s.view.canvas.width() as f64;
    let h = s.view.canvas.height() as f64;
    ctx.clear_rect(0.0, 0.0, w, h);

    ctx.set_stroke_style_str("rgba(255,255,255,0.9)");
    ctx.set_line_width(2.0);
    ctx.set_shadow_blur(10.0);
    ctx.set_shadow_color("#fff");
    ctx.begin_path();
    for crack in s.surface.cracks() {
        for &[x1, y1, x2, y2] in &crack.segments {
            ctx.move_to(x1, y1);
            ctx.line_to(x2, y2);
        }
    }
    ctx.stroke();
    ctx.set_shadow_blur(0.0);

    for p in s.surface.particles().iter() {
        ctx.set_global_alpha(p.alpha());
        ctx.set_fill_style_str(p.color);
        ctx.begin_path();
        let _ = ctx.arc(p.x, p.y, p.radius(), 0.0, TAU);
        ctx.fill();
    }
    ctx.set_global_alpha(1.0);
}

fn show_reveal(view: &View) {
    set_style(&view.dawn, "opacity", "1");
    set_style(&view.reveal, "display", "flex");
}
