use wasm_bindgen::prelude::*;
use wasm_bindgen::JsCast;
use web_sys::HtmlImageElement;
use web_time::Instant;

use crate::config::AppConfig;
use crate::highlight::ClassHighlighter;
use crate::media::{DisplayMode, LoadStatus, PageMetrics};
use crate::page::{Environment, Page};
use feedview_dom::{Document, Event, Key};

#[wasm_bindgen(start)]
pub fn start() {
    console_error_panic_hook::set_once();

    let config = AppConfig::load_from_local_storage().unwrap_or_default();
    let level = config
        .preferences
        .log_level
        .to_level_filter()
        .to_level()
        .unwrap_or(log::Level::Error);
    if let Err(e) = console_log::init_with_level(level) {
        web_sys::console::log_1(&format!("Logger already initialized: {}", e).into());
    }
    log::info!("feedview starting");
}

fn js_error(e: impl std::fmt::Display) -> JsValue {
    JsValue::from_str(&e.to_string())
}

/// Load state of an image in the live browser document.
fn browser_image_status(src: &str) -> LoadStatus {
    let Some(document) = web_sys::window().and_then(|w| w.document()) else {
        return LoadStatus::Failed;
    };
    let Ok(images) = document.query_selector_all("img") else {
        return LoadStatus::Failed;
    };
    for i in 0..images.length() {
        let Some(image) = images
            .get(i)
            .and_then(|n| n.dyn_into::<HtmlImageElement>().ok())
        else {
            continue;
        };
        if image.get_attribute("src").as_deref() != Some(src) {
            continue;
        }
        if !image.complete() {
            return LoadStatus::Pending;
        }
        return match image.natural_width() {
            0 => LoadStatus::Failed,
            natural_width => LoadStatus::Complete { natural_width },
        };
    }
    LoadStatus::Pending
}

/// A page fragment with every behavior installed, driven from JavaScript.
#[wasm_bindgen]
pub struct WebPage {
    page: Page,
    started: Instant,
}

#[wasm_bindgen]
impl WebPage {
    /// Bootstrap behaviors over `markup` using the live window's metrics.
    #[wasm_bindgen(constructor)]
    pub fn new(markup: &str, column_width: Option<f32>) -> Result<WebPage, JsValue> {
        let window = web_sys::window().ok_or_else(|| js_error("No window object available"))?;
        let config = AppConfig::load_from_local_storage().unwrap_or_default();
        let env = Environment {
            metrics: PageMetrics {
                column_width,
                device_pixel_ratio: window.device_pixel_ratio() as f32,
            },
            touch_device: window.navigator().max_touch_points() > 0,
        };

        let started = Instant::now();
        let doc = Document::parse_fragment(markup).map_err(js_error)?;
        let mut images = browser_image_status;
        let (page, _) = Page::bootstrap(
            doc,
            &config,
            env,
            &mut ClassHighlighter::new(),
            &mut images,
            started.elapsed(),
        )
        .map_err(js_error)?;
        Ok(WebPage { page, started })
    }

    /// Current markup of the page fragment.
    pub fn html(&self) -> String {
        let doc = self.page.document();
        doc.inner_html(doc.root())
    }

    pub fn tooltips_enabled(&self) -> bool {
        self.page.tooltips_enabled()
    }

    /// Re-check images still loading; call from the images' load events.
    pub fn refresh_images(&mut self) -> Result<(), JsValue> {
        let now = self.started.elapsed();
        for image in self.page.media().waiting_images() {
            let src = self
                .page
                .document()
                .attr(image, "src")
                .unwrap_or_default()
                .to_string();
            let status = browser_image_status(&src);
            let mut images = browser_image_status;
            self.page
                .image_loaded(image, status, &mut images, now)
                .map_err(js_error)?;
        }
        Ok(())
    }

    pub fn tick(&mut self) -> Result<(), JsValue> {
        self.page.tick(self.started.elapsed()).map_err(js_error)
    }

    /// Pointer movement or scrolling.
    pub fn activity(&mut self) -> Result<(), JsValue> {
        self.page
            .handle_event(&Event::MouseMoved, self.started.elapsed())
            .map_err(js_error)?;
        Ok(())
    }

    /// Tap the image of the viewer at `index`.
    pub fn tap_viewer(&mut self, index: usize) -> Result<bool, JsValue> {
        let Some(target) = self
            .page
            .media()
            .viewers()
            .get(index)
            .and_then(|v| v.images.first().copied())
        else {
            return Ok(false);
        };
        self.page
            .handle_event(&Event::Click { target }, self.started.elapsed())
            .map_err(js_error)?;
        Ok(true)
    }

    /// Activate the mode control named `mode` on the viewer at `index`.
    pub fn select_mode(&mut self, index: usize, mode: &str) -> Result<bool, JsValue> {
        let Some(mode) = DisplayMode::from_name(mode) else {
            return Ok(false);
        };
        let Some(viewer) = self.page.media().viewers().get(index).map(|v| v.root) else {
            return Ok(false);
        };
        let Some(target) = crate::media::mode_controls(self.page.document(), viewer)
            .into_iter()
            .find(|(_, m)| *m == mode)
            .map(|(control, _)| control)
        else {
            return Ok(false);
        };
        self.page
            .handle_event(&Event::Click { target }, self.started.elapsed())
            .map_err(js_error)?;
        Ok(true)
    }

    /// Feed a key press; returns a description of the matched command.
    pub fn key(&mut self, name: &str) -> Result<Option<String>, JsValue> {
        let Some(key) = Key::from_name(name) else {
            return Ok(None);
        };
        let response = self
            .page
            .handle_event(&Event::KeyPressed { key }, self.started.elapsed())
            .map_err(js_error)?;
        Ok(match response {
            crate::page::Response::Shortcut(command) => Some(format!("{:?}", command)),
            _ => None,
        })
    }

    /// Drain queued signal names.
    pub fn take_signals(&mut self) -> Vec<String> {
        self.page
            .take_signals()
            .iter()
            .map(|s| s.name().to_string())
            .collect()
    }
}
