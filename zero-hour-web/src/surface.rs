//! Shadow-DOM [`Surface`] for the `countdown-timer` element.
//!
//! Layout inside the shadow root:
//!
//! ```text
//! div.zh
//!   div.zh__group  span.zh__sep  div.zh__group  span.zh__sep  ...  span.zh__a11y
//!     span.zh__digit > span.zh__digit-track > span.zh__digit-face--current
//! ```

use std::collections::HashMap;
use std::rc::Rc;

use wasm_bindgen::JsCast;
use wasm_bindgen::closure::Closure;
use web_sys::{
    AddEventListenerOptions, Document, HtmlElement, HtmlStyleElement, Node, ShadowRoot,
    ShadowRootInit, ShadowRootMode, Window,
};
use zero_hour_core::constants::{
    CLASS_A11Y, CLASS_DIGIT, CLASS_DIGIT_FACE, CLASS_DIGIT_TRACK, CLASS_FACE_CURRENT,
    CLASS_FACE_NEXT, CLASS_GROUP, CLASS_ROOT, CLASS_SEPARATOR, DATA_DIGIT, PROP_SHEET_INDEX,
    SEPARATOR_SLOTS,
};
use zero_hour_core::{Glyph, SlotAddr, Surface, TransitionMode, TransitionToken, UnitGroup};

use crate::dom;
use crate::errors::{DomResultExt, WebError, warn_on_err};
use crate::styles::{self, Adoption, StylesInput};

const TRANSITION_END: &str = "transitionend";
const TRANSLATE_ABOVE: &str = "translateY(-100%)";
const TRANSLATE_HOME: &str = "translateY(0)";

/// Receives the end of a scroll transition reported by the browser.
pub type TransitionCallback = Rc<dyn Fn(TransitionToken)>;

type EndListener = Closure<dyn FnMut()>;

/// Renders the countdown into an open shadow root attached to the host.
pub struct ShadowSurface {
    window: Window,
    document: Document,
    shadow: ShadowRoot,
    root: HtmlElement,
    groups: [HtmlElement; 4],
    separators: [HtmlElement; SEPARATOR_SLOTS],
    summary: HtmlElement,
    style: Option<HtmlStyleElement>,
    on_transition_end: Option<TransitionCallback>,
    listeners: HashMap<SlotAddr, (HtmlElement, EndListener)>,
    // the listener removed last; it may be the one currently running
    retired: Option<EndListener>,
}

impl std::fmt::Debug for ShadowSurface {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShadowSurface")
            .field("inline_style", &self.style.is_some())
            .field("listeners", &self.listeners.len())
            .field("retired", &self.retired.is_some())
            .finish_non_exhaustive()
    }
}

impl ShadowSurface {
    /// Attach an open shadow root to `host` and build the static skeleton.
    ///
    /// # Errors
    /// Returns an error if the shadow root or any skeleton node cannot be
    /// created.
    pub fn attach(host: &HtmlElement) -> Result<Self, WebError> {
        let window = dom::window()?;
        let document = dom::document()?;
        let shadow = host
            .attach_shadow(&ShadowRootInit::new(ShadowRootMode::Open))
            .dom_op("attachShadow")?;

        let root = dom::create_element(&document, "div", CLASS_ROOT)?;
        let group = || dom::create_element(&document, "div", CLASS_GROUP);
        let separator = || dom::create_element(&document, "span", CLASS_SEPARATOR);
        let groups = [group()?, group()?, group()?, group()?];
        let separators = [separator()?, separator()?, separator()?];
        let summary = dom::create_element(&document, "span", CLASS_A11Y)?;
        summary
            .set_attribute("aria-live", "polite")
            .dom_op("setAttribute")?;

        for (index, group) in groups.iter().enumerate() {
            root.append_child(group).dom_op("appendChild")?;
            if let Some(separator) = separators.get(index) {
                root.append_child(separator).dom_op("appendChild")?;
            }
        }
        root.append_child(&summary).dom_op("appendChild")?;
        shadow.append_child(&root).dom_op("appendChild")?;

        let mut surface = Self {
            window,
            document,
            shadow,
            root,
            groups,
            separators,
            summary,
            style: None,
            on_transition_end: None,
            listeners: HashMap::new(),
            retired: None,
        };
        surface.adopt_styles(&StylesInput::Default);
        Ok(surface)
    }

    /// Route browser `transitionend` signals to `callback`.
    pub fn set_transition_callback(&mut self, callback: TransitionCallback) {
        self.on_transition_end = Some(callback);
    }

    #[must_use]
    pub const fn shadow_root(&self) -> &ShadowRoot {
        &self.shadow
    }

    /// Number of `transitionend` listeners still attached.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Style the shadow root, adopting a sheet where supported and falling
    /// back to an inline `<style>` otherwise.
    pub fn adopt_styles(&mut self, input: &StylesInput) {
        match styles::adopt(&self.shadow, input) {
            Adoption::Adopted => {
                if let Some(style) = self.style.take() {
                    style.remove();
                }
            }
            Adoption::Inline => {
                if let Err(err) = self.inline_style(input.fallback_text()) {
                    log::warn!("inline style fallback failed: {err}");
                }
            }
        }
    }

    fn inline_style(&mut self, css: &str) -> Result<(), WebError> {
        if self.style.is_none() {
            let style = self
                .document
                .create_element("style")
                .dom_op("createElement")?
                .dyn_into::<HtmlStyleElement>()
                .map_err(|_| WebError::Dom {
                    op: "createElement",
                    message: String::from("<style> is not an HTMLStyleElement"),
                })?;
            self.shadow
                .insert_before(&style, self.shadow.first_child().as_ref())
                .dom_op("insertBefore")?;
            self.style = Some(style);
        }
        if let Some(style) = &self.style {
            style.set_text_content(Some(css));
        }
        Ok(())
    }

    fn slot(&self, addr: SlotAddr) -> Option<HtmlElement> {
        let slots = self.groups[addr.group.index()].children();
        let index = u32::try_from(addr.index).ok()?;
        dom::as_html(slots.item(index))
    }

    fn track(&self, addr: SlotAddr) -> Option<HtmlElement> {
        let slot = self.slot(addr)?;
        dom::as_html(slot.first_element_child())
    }

    fn create_slot(&self, glyph: Glyph) -> Result<HtmlElement, WebError> {
        let digit = dom::create_element(&self.document, "span", CLASS_DIGIT)?;
        let track = dom::create_element(&self.document, "span", CLASS_DIGIT_TRACK)?;
        let face = self.create_face(glyph, CLASS_FACE_CURRENT)?;
        track.append_child(&face).dom_op("appendChild")?;
        digit.append_child(&track).dom_op("appendChild")?;
        Ok(digit)
    }

    fn create_face(&self, glyph: Glyph, role: &str) -> Result<HtmlElement, WebError> {
        let face = dom::create_element(
            &self.document,
            "span",
            &format!("{CLASS_DIGIT_FACE} {role}"),
        )?;
        set_face_digit(&face, glyph)?;
        Ok(face)
    }

    fn transition_ms(&self, track: &HtmlElement) -> Option<u32> {
        let computed = self.window.get_computed_style(track).ok()??;
        let durations = computed.get_property_value("transition-duration").ok()?;
        let delays = computed.get_property_value("transition-delay").ok()?;
        styles::transition_total_ms(&durations, &delays)
    }

    fn listen_for_end(&mut self, token: TransitionToken, track: &HtmlElement) {
        self.forget_listener(token.slot);
        let Some(callback) = self.on_transition_end.clone() else {
            return;
        };
        let listener: EndListener = Closure::new(move || callback(token));
        let options = AddEventListenerOptions::new();
        options.set_once(true);
        let added = track.add_event_listener_with_callback_and_add_event_listener_options(
            TRANSITION_END,
            listener.as_ref().unchecked_ref(),
            &options,
        );
        if warn_on_err(added, "addEventListener").is_some() {
            self.listeners.insert(token.slot, (track.clone(), listener));
        }
    }

    fn forget_listener(&mut self, addr: SlotAddr) {
        if let Some((track, listener)) = self.listeners.remove(&addr) {
            warn_on_err(
                track.remove_event_listener_with_callback(
                    TRANSITION_END,
                    listener.as_ref().unchecked_ref(),
                ),
                "removeEventListener",
            );
            // the previous one has returned by now; this one may not have
            self.retired = Some(listener);
        }
    }

    fn try_begin_scroll(
        &mut self,
        token: TransitionToken,
        next: Glyph,
    ) -> Result<Option<u32>, WebError> {
        let Some(track) = self.track(token.slot) else {
            return Ok(None);
        };
        let current = dom::as_html(
            track
                .query_selector(&format!(".{CLASS_FACE_CURRENT}"))
                .dom_op("querySelector")?,
        );
        let incoming = self.create_face(next, CLASS_FACE_NEXT)?;

        track.set_inner_html("");
        track.append_child(&incoming).dom_op("appendChild")?;
        if let Some(current) = &current {
            track.append_child(current).dom_op("appendChild")?;
        }

        let style = track.style();
        style.set_property("transition", "none").dom_op("setProperty")?;
        style
            .set_property("transform", TRANSLATE_ABOVE)
            .dom_op("setProperty")?;
        // commit the start position before re-enabling the transition
        let _ = track.offset_height();
        style.remove_property("transition").dom_op("removeProperty")?;
        style
            .set_property("transform", TRANSLATE_HOME)
            .dom_op("setProperty")?;

        self.listen_for_end(token, &track);
        Ok(self.transition_ms(&track))
    }

    fn try_finish_scroll(&mut self, addr: SlotAddr, mode: TransitionMode) -> Result<(), WebError> {
        self.forget_listener(addr);
        let Some(track) = self.track(addr) else {
            return Ok(());
        };
        let keep = dom::as_html(
            track
                .query_selector(&format!(".{CLASS_FACE_NEXT}"))
                .dom_op("querySelector")?,
        )
        .or_else(|| dom::as_html(track.first_element_child()));

        if let Some(keep) = &keep {
            let keep_node: &Node = keep;
            let faces = track.children();
            let mut index = faces.length();
            while index > 0 {
                index -= 1;
                if let Some(face) = faces.item(index)
                    && !face.is_same_node(Some(keep_node))
                {
                    face.remove();
                }
            }
            let classes = keep.class_list();
            classes.remove_1(CLASS_FACE_NEXT).dom_op("classList.remove")?;
            classes.add_1(CLASS_FACE_CURRENT).dom_op("classList.add")?;
        }

        let style = track.style();
        if mode == TransitionMode::Scroll {
            style.remove_property("transition").dom_op("removeProperty")?;
        } else {
            style.set_property("transition", "none").dom_op("setProperty")?;
        }
        style
            .set_property("transform", TRANSLATE_HOME)
            .dom_op("setProperty")?;
        Ok(())
    }
}

fn set_face_digit(face: &HtmlElement, glyph: Glyph) -> Result<(), WebError> {
    face.set_attribute(DATA_DIGIT, &glyph.as_char().to_string())
        .dom_op("setAttribute")?;
    face.style()
        .set_property(PROP_SHEET_INDEX, &glyph.sheet_index().to_string())
        .dom_op("setProperty")?;
    Ok(())
}

fn log_err(result: Result<(), WebError>) {
    if let Err(err) = result {
        log::warn!("{err}");
    }
}

impl Surface for ShadowSurface {
    fn set_style_property(&mut self, name: &str, value: Option<&str>) {
        let style = self.root.style();
        match value {
            Some(value) => {
                warn_on_err(style.set_property(name, value), "setProperty");
            }
            None => {
                warn_on_err(style.remove_property(name), "removeProperty");
            }
        }
    }

    fn set_class(&mut self, class: &str, enabled: bool) {
        warn_on_err(
            self.root.class_list().toggle_with_force(class, enabled),
            "classList.toggle",
        );
    }

    fn set_group_visible(&mut self, group: UnitGroup, visible: bool) {
        log_err(dom::set_displayed(&self.groups[group.index()], visible));
    }

    fn set_separator_visible(&mut self, index: usize, visible: bool) {
        if let Some(separator) = self.separators.get(index) {
            log_err(dom::set_displayed(separator, visible));
        }
    }

    fn set_summary(&mut self, text: &str) {
        self.summary.set_text_content(Some(text));
    }

    fn push_slot(&mut self, group: UnitGroup, glyph: Glyph) {
        let appended = self.create_slot(glyph).and_then(|slot| {
            self.groups[group.index()]
                .append_child(&slot)
                .dom_op("appendChild")
                .map(|_| ())
        });
        log_err(appended);
    }

    fn pop_slot(&mut self, group: UnitGroup) {
        let container = &self.groups[group.index()];
        let count = usize::try_from(container.child_element_count()).unwrap_or(0);
        if let Some(last) = container.last_element_child() {
            last.remove();
        }
        if let Some(index) = count.checked_sub(1) {
            self.forget_listener(SlotAddr::new(group, index));
        }
    }

    fn set_digit(&mut self, slot: SlotAddr, glyph: Glyph) {
        let Some(track) = self.track(slot) else {
            return;
        };
        let face = track
            .query_selector(&format!(".{CLASS_FACE_CURRENT}"))
            .ok()
            .flatten()
            .or_else(|| track.first_element_child());
        if let Some(face) = dom::as_html(face) {
            log_err(set_face_digit(&face, glyph));
        }
    }

    fn begin_scroll(&mut self, token: TransitionToken, next: Glyph) -> Option<u32> {
        match self.try_begin_scroll(token, next) {
            Ok(ms) => ms,
            Err(err) => {
                log::warn!("scroll on {:?} not started: {err}", token.slot);
                None
            }
        }
    }

    fn finish_scroll(&mut self, slot: SlotAddr, mode: TransitionMode) {
        log_err(self.try_finish_scroll(slot, mode));
    }
}
