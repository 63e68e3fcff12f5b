use std::cell::{Cell, RefCell};
use std::io::Cursor;
use std::rc::Rc;

use gloo::events::{EventListener, EventListenerOptions, EventListenerPhase};
use gloo::render::{AnimationFrame, request_animation_frame};
use gloo::timers::callback::Timeout;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use web_sys::{
    Blob, BlobPropertyBag, CssGroupingRule, CssRuleList, CssStyleRule, CssStyleSheet, Element,
    Event, HtmlAnchorElement, HtmlElement, KeyboardEvent, Node, ScrollBehavior, ScrollToOptions,
    TouchEvent, Url, WheelEvent, Window,
};

use crate::compact::{DecomposeOptions, Page, decompose};
use crate::config::MobileSettings;
use crate::dom::html::to_xhtml;
use crate::dom::{self, Document, Tree};
use crate::export::{BookMeta, write_epub};
use crate::mobile::fit::{FontFitter, ProbeMetrics, SizeProbe, StyleSheet};
use crate::mobile::{self, BuildOptions, MobileView, STYLESHEET};
use crate::nav::input::{ScrubberDrag, Track, WheelDebouncer, WheelSample, key_action};
use crate::nav::url::PageCodec;
use crate::nav::{Host, Location, NavAction, NavModel, Navigator, is_mobile};
use crate::parser::PresentationMeta;

/// Slide roots as the desktop renderer emits them.
const SLIDE_SELECTOR: &str = "section[data-slide]";
const BODY_CLASS: &str = "pagedeck-mobile";
const STYLE_ID: &str = "pagedeck-mobile-style";
const FIT_DELAY_MS: u32 = 500;
const RESIZE_FIT_DELAY_MS: u32 = 150;

#[wasm_bindgen(start)]
pub fn init() {
    console_error_panic_hook::set_once();
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

fn element(node: &Node) -> Result<Element, JsValue> {
    node.clone().dyn_into::<Element>().map_err(JsValue::from)
}

fn html_element(node: &Node) -> Result<HtmlElement, JsValue> {
    node.clone().dyn_into::<HtmlElement>().map_err(JsValue::from)
}

/// Slide roots of the desktop deck, leaving out copies inside a mounted view.
fn desktop_slides(document: &web_sys::Document) -> Result<Vec<Node>, JsValue> {
    let list = document.query_selector_all(SLIDE_SELECTOR)?;
    let inside_view = format!(".{}", mobile::ROOT_CLASS);
    Ok((0..list.length())
        .filter_map(|i| list.get(i))
        .filter(|node| {
            node.dyn_ref::<Element>()
                .is_none_or(|el| matches!(el.closest(&inside_view), Ok(None)))
        })
        .collect())
}

/// [`Document`] over the browser DOM.
#[derive(Clone)]
pub struct WebDocument {
    document: web_sys::Document,
}

impl WebDocument {
    pub fn new(document: web_sys::Document) -> Self {
        Self { document }
    }

    fn placeholder(&self) -> Node {
        self.document.create_text_node("").into()
    }
}

impl Document for WebDocument {
    type Node = Node;

    fn tag_name(&self, node: &Node) -> Option<String> {
        node.dyn_ref::<Element>()
            .map(|el| el.tag_name().to_ascii_lowercase())
    }

    fn attribute(&self, node: &Node, name: &str) -> Option<String> {
        node.dyn_ref::<Element>()?.get_attribute(name)
    }

    fn attributes(&self, node: &Node) -> Vec<(String, String)> {
        let Some(el) = node.dyn_ref::<Element>() else {
            return Vec::new();
        };
        el.get_attribute_names()
            .iter()
            .filter_map(|name| name.as_string())
            .filter_map(|name| {
                let value = el.get_attribute(&name)?;
                Some((name, value))
            })
            .collect()
    }

    fn children(&self, node: &Node) -> Vec<Node> {
        let list = node.child_nodes();
        (0..list.length()).filter_map(|i| list.get(i)).collect()
    }

    fn text_content(&self, node: &Node) -> String {
        node.text_content().unwrap_or_default()
    }

    fn clone_subtree(&mut self, node: &Node) -> Node {
        node.clone_node_with_deep(true).unwrap_or_else(|e| {
            log::warn!("clone failed: {e:?}");
            self.placeholder()
        })
    }

    fn create_element(&mut self, tag: &str) -> Node {
        match self.document.create_element(tag) {
            Ok(el) => el.into(),
            Err(e) => {
                log::warn!("cannot create <{tag}>: {e:?}");
                self.placeholder()
            }
        }
    }

    fn create_text(&mut self, text: &str) -> Node {
        self.document.create_text_node(text).into()
    }

    fn set_attribute(&mut self, node: &Node, name: &str, value: &str) {
        if let Some(el) = node.dyn_ref::<Element>() {
            if let Err(e) = el.set_attribute(name, value) {
                log::warn!("cannot set {name}: {e:?}");
            }
        }
    }

    fn append_child(&mut self, parent: &Node, child: &Node) {
        if let Err(e) = parent.append_child(child) {
            log::warn!("append failed: {e:?}");
        }
    }
}

/// The live page seen through the navigator's [`Host`] interface.
struct WebHost {
    window: Window,
    document: web_sys::Document,
    headers: Element,
    pages: Element,
    chapter_links: Vec<Element>,
    scrubber: Option<(HtmlElement, Element)>,
}

impl WebHost {
    fn new(
        window: Window,
        document: web_sys::Document,
        view: &MobileView<Node>,
    ) -> Result<Self, JsValue> {
        let scrubber = match &view.scrubber {
            Some(s) => Some((html_element(&s.handle)?, element(&s.label)?)),
            None => None,
        };
        Ok(Self {
            window,
            document,
            headers: element(&view.headers)?,
            pages: element(&view.pages)?,
            chapter_links: view
                .chapter_links
                .iter()
                .map(element)
                .collect::<Result<_, _>>()?,
            scrubber,
        })
    }
}

impl Host for WebHost {
    fn page_width(&self) -> f64 {
        f64::from(self.pages.client_width())
    }

    fn scroll_offset(&self) -> f64 {
        f64::from(self.pages.scroll_left())
    }

    fn set_scroll_offset(&mut self, offset: f64, smooth: bool) {
        if smooth {
            let options = ScrollToOptions::new();
            options.set_left(offset);
            options.set_behavior(ScrollBehavior::Smooth);
            self.pages.scroll_to_with_scroll_to_options(&options);
        } else {
            self.pages.set_scroll_left(offset.round() as i32);
        }
    }

    fn header_offset(&self) -> f64 {
        f64::from(self.headers.scroll_left())
    }

    fn set_header_offset(&mut self, offset: f64) {
        self.headers.set_scroll_left(offset as i32);
    }

    fn location(&self) -> Location {
        let location = self.window.location();
        Location {
            path: location.pathname().unwrap_or_default(),
            search: location.search().unwrap_or_default(),
        }
    }

    fn push_history(&mut self, url: &str) {
        let pushed = self
            .window
            .history()
            .and_then(|h| h.push_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = pushed {
            log::warn!("pushState {url} failed: {e:?}");
        }
    }

    fn replace_history(&mut self, url: &str) {
        let replaced = self
            .window
            .history()
            .and_then(|h| h.replace_state_with_url(&JsValue::NULL, "", Some(url)));
        if let Err(e) = replaced {
            log::warn!("replaceState {url} failed: {e:?}");
        }
    }

    fn set_title(&mut self, title: &str) {
        self.document.set_title(title);
    }

    fn set_scrubber(&mut self, fraction: f64, label: &str) {
        let Some((handle, text)) = &self.scrubber else {
            return;
        };
        let left = format!("{:.3}%", fraction * 100.0);
        if let Err(e) = handle.style().set_property("left", &left) {
            log::warn!("cannot move scrubber handle: {e:?}");
        }
        text.set_text_content(Some(label));
    }

    fn set_chapter_active(&mut self, chapter: usize, active: bool) {
        if let Some(link) = self.chapter_links.get(chapter) {
            if let Err(e) = link.class_list().toggle_with_force("active", active) {
                log::warn!("cannot mark chapter {chapter}: {e:?}");
            }
        }
    }
}

/// Measures text in the view's hidden sizer page.
#[derive(Clone)]
struct SizerProbe {
    sizer: Element,
    content: HtmlElement,
}

impl SizerProbe {
    fn clear(&self) {
        self.content.set_text_content(None);
        if let Err(e) = self.content.style().remove_property("font-size") {
            log::debug!("sizer reset failed: {e:?}");
        }
    }
}

impl SizeProbe for SizerProbe {
    fn measure(&mut self, text: &str, font_size_px: u32) -> ProbeMetrics {
        self.content.set_text_content(Some(text));
        if let Err(e) = self
            .content
            .style()
            .set_property("font-size", &format!("{font_size_px}px"))
        {
            log::warn!("cannot size probe text: {e:?}");
        }
        ProbeMetrics {
            scroll_height: f64::from(self.sizer.scroll_height()),
            client_height: f64::from(self.sizer.client_height()),
        }
    }
}

/// Style rules of every same-origin stylesheet in the document.
struct CssomSheet {
    rules: Vec<CssStyleRule>,
}

impl CssomSheet {
    fn collect(document: &web_sys::Document) -> Self {
        let mut rules = Vec::new();
        let sheets = document.style_sheets();
        for i in 0..sheets.length() {
            let Some(sheet) = sheets
                .item(i)
                .and_then(|s| s.dyn_into::<CssStyleSheet>().ok())
            else {
                continue;
            };
            // cross-origin sheets refuse cssRules
            let Ok(list) = sheet.css_rules() else {
                continue;
            };
            collect_style_rules(&list, &mut rules);
        }
        Self { rules }
    }
}

/// Style rules in source order, including those nested in `@media` and other
/// grouping rules.
fn collect_style_rules(list: &CssRuleList, out: &mut Vec<CssStyleRule>) {
    for rule in (0..list.length()).filter_map(|i| list.item(i)) {
        match rule.dyn_into::<CssStyleRule>() {
            Ok(style) => out.push(style),
            Err(rule) => {
                if let Ok(group) = rule.dyn_into::<CssGroupingRule>() {
                    collect_style_rules(&group.css_rules(), out);
                }
            }
        }
    }
}

impl StyleSheet for CssomSheet {
    fn declarations(&self, property: &str) -> Vec<(usize, String)> {
        self.rules
            .iter()
            .enumerate()
            .filter_map(|(i, rule)| {
                let value = rule.style().get_property_value(property).ok()?;
                let value = value.trim();
                (!value.is_empty()).then(|| (i, value.to_string()))
            })
            .collect()
    }

    fn set_declaration(&mut self, rule: usize, property: &str, value: &str) {
        if let Some(rule) = self.rules.get(rule) {
            if let Err(e) = rule.style().set_property(property, value) {
                log::warn!("cannot set {property}: {e:?}");
            }
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum TouchPhase {
    Start,
    Move,
    End,
}

struct MobileRuntime {
    window: Window,
    document: web_sys::Document,
    root: Element,
    style: Element,
    strip: Element,
    track: Option<Element>,
    sizer: SizerProbe,
    pages: Vec<Page<Node>>,
    snap_band: f64,
    nav: RefCell<Navigator>,
    host: RefCell<WebHost>,
    fitter: RefCell<FontFitter>,
    wheel: RefCell<WheelDebouncer>,
    drag: RefCell<Option<ScrubberDrag>>,
    listeners: RefCell<Vec<EventListener>>,
    frame: RefCell<Option<AnimationFrame>>,
    fit_timer: RefCell<Option<Timeout>>,
    disposed: Cell<bool>,
}

impl MobileRuntime {
    fn start(
        window: Window,
        document: web_sys::Document,
        settings: &MobileSettings,
    ) -> Result<Rc<Self>, JsValue> {
        let body = document
            .body()
            .ok_or_else(|| JsValue::from_str("document has no body"))?;
        let mut doc = WebDocument::new(document.clone());
        let slides = desktop_slides(&document)?;
        let options = DecomposeOptions {
            default_splits: settings.split_points(),
        };
        let deck = decompose(&mut doc, &slides, &options);

        let style = document.create_element("style")?;
        style.set_id(STYLE_ID);
        style.set_text_content(Some(STYLESHEET));
        let style_parent: Node = match document.head() {
            Some(head) => head.into(),
            None => body.clone().into(),
        };
        style_parent.append_child(&style)?;

        let view = mobile::build(&mut doc, &deck, &BuildOptions::default());
        body.append_child(&view.root)?;
        body.class_list().add_1(BODY_CLASS)?;

        let model = NavModel::from_decomposition(&deck, &document.title());
        let codec = PageCodec::for_pages(settings.url_mode, &deck.pages);
        let host = WebHost::new(window.clone(), document.clone(), &view)?;

        let runtime = Rc::new(Self {
            root: element(&view.root)?,
            strip: element(&view.pages)?,
            track: match &view.scrubber {
                Some(s) => Some(element(&s.track)?),
                None => None,
            },
            sizer: SizerProbe {
                sizer: element(&view.sizer)?,
                content: html_element(&view.sizer_content)?,
            },
            pages: deck.pages,
            snap_band: settings.snap_band_px,
            nav: RefCell::new(Navigator::new(model, codec, settings.history)),
            host: RefCell::new(host),
            fitter: RefCell::new(FontFitter::new(settings.font_sizes.clone())),
            wheel: RefCell::new(WheelDebouncer::new(settings.wheel_cooldown_ms)),
            drag: RefCell::new(None),
            listeners: RefCell::new(Vec::new()),
            frame: RefCell::new(None),
            fit_timer: RefCell::new(None),
            disposed: Cell::new(false),
            window,
            document,
            style,
        });

        {
            let host = runtime.host.borrow();
            runtime.nav.borrow_mut().restore(&*host);
        }
        runtime.install_listeners();
        runtime.schedule_frame();
        runtime.schedule_fit(FIT_DELAY_MS);
        log::debug!("mobile view mounted: {} pages", runtime.pages.len());
        Ok(runtime)
    }

    fn apply(&self, action: NavAction) {
        let mut host = self.host.borrow_mut();
        self.nav.borrow_mut().apply(&mut *host, action);
    }

    fn schedule_frame(self: &Rc<Self>) {
        let runtime = Rc::clone(self);
        let handle = request_animation_frame(move |_| {
            runtime.frame.borrow_mut().take();
            if runtime.disposed.get() {
                return;
            }
            {
                let mut host = runtime.host.borrow_mut();
                runtime.nav.borrow_mut().tick(&mut *host);
            }
            runtime.schedule_frame();
        });
        *self.frame.borrow_mut() = Some(handle);
    }

    /// Fit after `delay_ms`; a pending fit is replaced.
    fn schedule_fit(self: &Rc<Self>, delay_ms: u32) {
        let runtime = Rc::clone(self);
        let timer = Timeout::new(delay_ms, move || runtime.fit());
        *self.fit_timer.borrow_mut() = Some(timer);
    }

    fn fit(&self) {
        if self.disposed.get() {
            return;
        }
        let doc = WebDocument::new(self.document.clone());
        let mut probe = self.sizer.clone();
        let mut sheet = CssomSheet::collect(&self.document);
        let size = self
            .fitter
            .borrow_mut()
            .fit(&doc, &self.pages, &mut probe, &mut sheet);
        probe.clear();
        log::debug!("mobile font size {size}px");

        // a new page width moves every page; keep the current one in view
        let mut host = self.host.borrow_mut();
        if let Some(page) = self.nav.borrow().current_page() {
            let width = host.page_width();
            host.set_scroll_offset(page as f64 * width, false);
        }
    }

    fn scrub(&self, phase: TouchPhase, event: &TouchEvent, track: &Element) {
        let touches = match phase {
            TouchPhase::End => event.changed_touches(),
            _ => event.touches(),
        };
        let Some(touch) = touches.get(0) else {
            return;
        };
        let x = f64::from(touch.client_x());
        let rect = track.get_bounding_client_rect();
        let bounds = Track {
            left: rect.left(),
            width: rect.width(),
        };

        let mut host = self.host.borrow_mut();
        let mut nav = self.nav.borrow_mut();
        let count = nav.model().page_count();
        match phase {
            TouchPhase::Start => {
                let drag = ScrubberDrag::begin(x, nav.position(&*host), self.snap_band);
                *self.drag.borrow_mut() = Some(drag);
            }
            TouchPhase::Move => {
                if let Some(drag) = *self.drag.borrow() {
                    nav.scrub_to(&mut *host, drag.position(x, bounds, count));
                }
            }
            TouchPhase::End => {
                if let Some(drag) = self.drag.borrow_mut().take() {
                    let page = drag.release(x, bounds, count);
                    nav.apply(&mut *host, NavAction::GoTo(page));
                }
            }
        }
    }

    fn install_listeners(self: &Rc<Self>) {
        let mut listeners = Vec::new();
        let active = EventListenerOptions {
            phase: EventListenerPhase::Bubble,
            passive: false,
        };

        let runtime = Rc::clone(self);
        listeners.push(EventListener::new_with_options(
            &self.window,
            "keydown",
            active,
            move |event: &Event| {
                let Some(event) = event.dyn_ref::<KeyboardEvent>() else {
                    return;
                };
                if let Some(action) = key_action(&event.key(), event.shift_key()) {
                    event.prevent_default();
                    runtime.apply(action);
                }
            },
        ));

        let runtime = Rc::clone(self);
        listeners.push(EventListener::new_with_options(
            &self.strip,
            "wheel",
            active,
            move |event: &Event| {
                let Some(event) = event.dyn_ref::<WheelEvent>() else {
                    return;
                };
                event.prevent_default();
                let raw: &JsValue = event.as_ref();
                let wheel_delta = js_sys::Reflect::get(raw, &JsValue::from_str("wheelDelta"))
                    .ok()
                    .and_then(|v| v.as_f64());
                let sample = WheelSample {
                    delta_x: event.delta_x(),
                    delta_y: event.delta_y(),
                    delta_mode: event.delta_mode(),
                    wheel_delta,
                };
                let action = runtime.wheel.borrow_mut().accept(event.time_stamp(), sample);
                if let Some(action) = action {
                    runtime.apply(action);
                }
            },
        ));

        if let Some(track) = &self.track {
            let phases = [
                ("touchstart", TouchPhase::Start),
                ("touchmove", TouchPhase::Move),
                ("touchend", TouchPhase::End),
            ];
            for (name, phase) in phases {
                let runtime = Rc::clone(self);
                let target = track.clone();
                listeners.push(EventListener::new_with_options(
                    track,
                    name,
                    active,
                    move |event: &Event| {
                        let Some(event) = event.dyn_ref::<TouchEvent>() else {
                            return;
                        };
                        event.prevent_default();
                        runtime.scrub(phase, event, &target);
                    },
                ));
            }
        }

        let links = self.host.borrow().chapter_links.clone();
        for link in links {
            let page = link
                .get_attribute("data-page")
                .and_then(|p| p.parse::<usize>().ok());
            let runtime = Rc::clone(self);
            listeners.push(EventListener::new_with_options(
                &link,
                "click",
                active,
                move |event: &Event| {
                    event.prevent_default();
                    if let Some(page) = page {
                        runtime.apply(NavAction::GoTo(page));
                    }
                },
            ));
        }

        let runtime = Rc::clone(self);
        listeners.push(EventListener::new(&self.window, "popstate", move |_| {
            let host = runtime.host.borrow();
            runtime.nav.borrow_mut().restore(&*host);
        }));

        let runtime = Rc::clone(self);
        listeners.push(EventListener::new(&self.window, "resize", move |_| {
            runtime.schedule_fit(RESIZE_FIT_DELAY_MS);
        }));

        *self.listeners.borrow_mut() = listeners;
    }

    fn dispose(&self) {
        if self.disposed.replace(true) {
            return;
        }
        self.listeners.borrow_mut().clear();
        self.frame.borrow_mut().take();
        self.fit_timer.borrow_mut().take();
        self.root.remove();
        self.style.remove();
        if let Some(body) = self.document.body() {
            if let Err(e) = body.class_list().remove_1(BODY_CLASS) {
                log::warn!("cannot remove {BODY_CLASS}: {e:?}");
            }
        }
        log::debug!("mobile view disposed");
    }
}

/// A mounted mobile view.
#[wasm_bindgen]
pub struct MobileHandle {
    runtime: Rc<MobileRuntime>,
}

#[wasm_bindgen]
impl MobileHandle {
    /// Remove the view and release every listener, frame and timer.
    pub fn dispose(&self) {
        self.runtime.dispose();
    }
}

fn parse_settings(settings: Option<String>) -> Result<MobileSettings, JsValue> {
    match settings {
        Some(json) => serde_json::from_str(&json).map_err(js_error),
        None => Ok(MobileSettings::default()),
    }
}

/// Mount the mobile view over the rendered deck on phones, or when the query
/// string is `?mobile`. Returns `undefined` when the desktop deck should stay.
#[wasm_bindgen]
pub fn mount(settings: Option<String>) -> Result<Option<MobileHandle>, JsValue> {
    let window = web_sys::window().ok_or_else(|| JsValue::from_str("no window"))?;
    let document = window
        .document()
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let user_agent = window.navigator().user_agent().unwrap_or_default();
    let search = window.location().search().unwrap_or_default();
    if !is_mobile(&user_agent, &search) {
        return Ok(None);
    }
    let settings = parse_settings(settings)?;
    let runtime = MobileRuntime::start(window, document, &settings)?;
    Ok(Some(MobileHandle { runtime }))
}

fn meta_content(document: &web_sys::Document, name: &str) -> Option<String> {
    document
        .query_selector(&format!("meta[name=\"{name}\"]"))
        .ok()
        .flatten()
        .and_then(|el| el.get_attribute("content"))
        .filter(|v| !v.is_empty())
}

fn page_meta(document: &web_sys::Document) -> PresentationMeta {
    let title = document.title();
    PresentationMeta {
        title: (!title.is_empty()).then_some(title),
        author: meta_content(document, "author"),
        description: meta_content(document, "description"),
        language: document
            .document_element()
            .and_then(|el| el.get_attribute("lang")),
        identifier: meta_content(document, "identifier"),
    }
}

fn download_package(settings: &MobileSettings) -> Result<(), JsValue> {
    let document = web_sys::window()
        .and_then(|w| w.document())
        .ok_or_else(|| JsValue::from_str("no document"))?;
    let mut doc = WebDocument::new(document.clone());
    let slides = desktop_slides(&document)?;
    let options = DecomposeOptions {
        default_splits: settings.split_points(),
    };
    let deck = decompose(&mut doc, &slides, &options);
    let meta = BookMeta::from_presentation(&page_meta(&document));

    let mut tree = Tree::new();
    let bytes = write_epub(
        &meta,
        &deck,
        |page| {
            let copy = dom::import_subtree(&doc, &page.content, &mut tree);
            to_xhtml(&tree, copy)
        },
        Cursor::new(Vec::new()),
    )
    .map_err(js_error)?
    .into_inner();

    let parts = js_sys::Array::of1(&js_sys::Uint8Array::from(bytes.as_slice()));
    let blob_options = BlobPropertyBag::new();
    blob_options.set_type("application/epub+zip");
    let blob = Blob::new_with_u8_array_sequence_and_options(&parts, &blob_options)?;
    let url = Url::create_object_url_with_blob(&blob)?;

    let anchor: HtmlAnchorElement = document.create_element("a")?.dyn_into()?;
    anchor.set_href(&url);
    anchor.set_download(&meta.file_name());
    anchor.click();
    Url::revoke_object_url(&url)?;
    log::debug!("downloaded {} ({} bytes)", meta.file_name(), bytes.len());
    Ok(())
}

/// Package the deck's reading pages as an EPUB and download it. The promise
/// resolves once the download has been handed to the browser.
#[wasm_bindgen(js_name = downloadKindlePackage)]
pub fn download_kindle_package(settings: Option<String>) -> js_sys::Promise {
    js_sys::Promise::new(&mut |resolve, reject| {
        let result = parse_settings(settings.clone())
            .and_then(|settings| download_package(&settings))
            .and_then(|()| resolve.call0(&JsValue::NULL));
        if let Err(e) = result {
            if let Err(e) = reject.call1(&JsValue::NULL, &e) {
                log::error!("cannot reject download promise: {e:?}");
            }
        }
    })
}
