// Browser tests for the mounted iron house. Run with `wasm-pack test --headless --chrome`.
#![cfg(target_arch = "wasm32")]

use std::cell::Cell;
use std::rc::Rc;

use iron_house::mount_iron_house;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_test::*;
use web_sys::{Document, HtmlElement};

wasm_bindgen_test_configure!(run_in_browser);

fn document() -> Document {
    web_sys::window().unwrap().document().unwrap()
}

fn container(id: &str) -> HtmlElement {
    let doc = document();
    let el: HtmlElement = doc.create_element("div").unwrap().dyn_into().unwrap();
    el.set_id(id);
    el.style().set_property("width", "640px").unwrap();
    el.style().set_property("height", "360px").unwrap();
    doc.body().unwrap().append_child(&el).unwrap();
    el
}

async fn sleep(ms: i32) {
    let promise = js_sys::Promise::new(&mut |resolve, _reject| {
        web_sys::window()
            .unwrap()
            .set_timeout_with_callback_and_timeout_and_arguments_0(&resolve, ms)
            .unwrap();
    });
    wasm_bindgen_futures::JsFuture::from(promise).await.unwrap();
}

/// A JS function that bumps the returned counter each time it is called.
fn counting_callback() -> (Rc<Cell<u32>>, Closure<dyn FnMut()>, js_sys::Function) {
    let count = Rc::new(Cell::new(0u32));
    let counter = count.clone();
    let closure = Closure::<dyn FnMut()>::new(move || counter.set(counter.get() + 1));
    let func = closure.as_ref().unchecked_ref::<js_sys::Function>().clone();
    (count, closure, func)
}

fn frame_in(host: &HtmlElement) -> HtmlElement {
    host.query_selector("[data-iron-house=frame]")
        .unwrap()
        .expect("frame element")
        .dyn_into()
        .unwrap()
}

#[wasm_bindgen_test]
fn click_registers_a_strike() {
    let host = container("ih-click");
    let handle = mount_iron_house("ih-click", None, None, None).unwrap();
    assert_eq!(handle.state(), "idle");
    assert_eq!(handle.hits(), 0);

    frame_in(&host).click();
    assert_eq!(handle.hits(), 1);
    assert_eq!(handle.state(), "accumulating");

    handle.unmount();
    host.remove();
}

#[wasm_bindgen_test]
fn first_strike_fires_engage_once() {
    let host = container("ih-engage");
    let (engaged, on_engage, func) = counting_callback();

    let handle = mount_iron_house("ih-engage", None, Some(func), None).unwrap();
    let frame = frame_in(&host);
    frame.click();
    frame.click();
    frame.click();
    assert_eq!(handle.hits(), 3);
    assert_eq!(engaged.get(), 1);

    handle.unmount();
    drop(on_engage);
    host.remove();
}

#[wasm_bindgen_test]
fn unmount_removes_markup() {
    let host = container("ih-unmount");
    let handle = mount_iron_house("ih-unmount", None, None, None).unwrap();
    assert!(host.query_selector("[data-iron-house=root]").unwrap().is_some());
    handle.unmount();
    assert!(host.query_selector("[data-iron-house=root]").unwrap().is_none());
    host.remove();
}

#[wasm_bindgen_test]
fn mount_rejects_bad_input() {
    let host = container("ih-bad");
    assert!(mount_iron_house("ih-missing", None, None, None).is_err());
    assert!(mount_iron_house("ih-bad", None, None, Some(r#"{"threshold":0}"#.into())).is_err());
    assert!(mount_iron_house("ih-bad", None, None, Some("{not json".into())).is_err());
    assert!(host.query_selector("[data-iron-house=root]").unwrap().is_none());
    host.remove();
}

#[wasm_bindgen_test]
fn partial_config_lowers_threshold() {
    let host = container("ih-threshold");
    let handle =
        mount_iron_house("ih-threshold", None, None, Some(r#"{"threshold":2}"#.into())).unwrap();
    let frame = frame_in(&host);
    frame.click();
    frame.click();
    assert_eq!(handle.state(), "breaking");
    frame.click();
    assert_eq!(handle.hits(), 2);
    handle.unmount();
    host.remove();
}

#[wasm_bindgen_test]
async fn break_completes_once_after_delay() {
    let host = container("ih-break");
    let (breaks, _keep, on_break) = counting_callback();
    let handle =
        mount_iron_house("ih-break", Some(on_break), None, Some(r#"{"threshold":1}"#.into()))
            .unwrap();
    let frame = frame_in(&host);
    frame.click();
    assert_eq!(handle.state(), "breaking");
    assert_eq!(breaks.get(), 0);

    sleep(200).await;
    assert_eq!(breaks.get(), 0);
    frame.click();

    sleep(600).await;
    assert_eq!(breaks.get(), 1);
    assert_eq!(handle.state(), "revealed");

    frame.click();
    sleep(100).await;
    assert_eq!(breaks.get(), 1);
    assert_eq!(handle.hits(), 1);

    handle.unmount();
    host.remove();
}

#[wasm_bindgen_test]
async fn unmount_during_break_still_completes() {
    let host = container("ih-break-unmount");
    let (breaks, _keep, on_break) = counting_callback();
    let handle = mount_iron_house(
        "ih-break-unmount",
        Some(on_break),
        None,
        Some(r#"{"threshold":1}"#.into()),
    )
    .unwrap();
    frame_in(&host).click();
    handle.unmount();
    assert_eq!(breaks.get(), 0);

    sleep(700).await;
    assert_eq!(breaks.get(), 1);
    sleep(200).await;
    assert_eq!(breaks.get(), 1);
    host.remove();
}

#[wasm_bindgen_test]
async fn unmount_detaches_listeners_and_frames() {
    let host = container("ih-detach");
    let (breaks, _keep_break, on_break) = counting_callback();
    let (engages, _keep_engage, on_engage) = counting_callback();
    let handle = mount_iron_house(
        "ih-detach",
        Some(on_break),
        Some(on_engage),
        Some(r#"{"threshold":2}"#.into()),
    )
    .unwrap();
    let frame = frame_in(&host);
    frame.click();
    assert_eq!(engages.get(), 1);
    handle.unmount();

    // A live listener would count this as the breaking strike.
    frame.click();
    frame.click();
    sleep(800).await;
    assert_eq!(engages.get(), 1);
    assert_eq!(breaks.get(), 0);
    assert!(host.query_selector("[data-iron-house=root]").unwrap().is_none());
    host.remove();
}
