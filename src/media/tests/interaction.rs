use feedview_dom::{Dispatch, Event};

use super::*;
use crate::constants::{attrs, roles};
use crate::media::{mode_controls, selected_mode, DisplayMode};

fn with_viewer(device_pixel_ratio: f32, body: &str, src: &str, width: u32) -> (Document, MediaEngine, NodeId) {
    let mut doc = article(body);
    let mut engine = engine(600.0, device_pixel_ratio);
    let mut images = KnownImages::new().loaded(src, width);
    scanned(&mut engine, &mut doc, &mut images);
    let viewer = engine.viewers()[0].root;
    engine.take_signals();
    (doc, engine, viewer)
}

fn control(doc: &Document, viewer: NodeId, mode: DisplayMode) -> NodeId {
    mode_controls(doc, viewer)
        .into_iter()
        .find(|(_, m)| *m == mode)
        .map(|(c, _)| c)
        .unwrap()
}

fn click(engine: &mut MediaEngine, doc: &mut Document, target: NodeId, at: u64) -> Dispatch {
    engine
        .handle_event(doc, &Event::Click { target }, ms(at))
        .unwrap()
}

fn rendered_width(doc: &Document, viewer: NodeId) -> String {
    let img = doc
        .find_first(viewer, |d, n| d.attr(n, roles::ATTR) == Some(roles::VIEWER_IMAGE) && d.is_tag(n, "img"))
        .unwrap();
    doc.style(img, "width").unwrap_or_default().to_string()
}

#[test]
fn test_low_density_offers_two_modes() {
    let (doc, _, viewer) = with_viewer(1.0, r#"<img src="wide.png">"#, "wide.png", 2000);
    let modes: Vec<_> = mode_controls(&doc, viewer).into_iter().map(|(_, m)| m).collect();
    assert_eq!(modes, vec![DisplayMode::AutoFit, DisplayMode::ActualSize]);
}

#[test]
fn test_retina_mode_halves_probed_width() {
    let (mut doc, mut engine, viewer) = with_viewer(2.0, r#"<img src="wide.png">"#, "wide.png", 2000);
    assert_eq!(mode_controls(&doc, viewer).len(), 3);

    let retina = control(&doc, viewer, DisplayMode::RetinaHalved);
    let dispatch = click(&mut engine, &mut doc, retina, 100);

    assert_eq!(dispatch, Dispatch::consumed());
    assert_eq!(rendered_width(&doc, viewer), "1000px");
    assert_eq!(
        engine.take_signals(),
        vec![Signal::ModeChanged {
            viewer,
            mode: DisplayMode::RetinaHalved
        }]
    );
}

#[test]
fn test_selected_control_click_is_idempotent() {
    let (mut doc, mut engine, viewer) = with_viewer(1.0, r#"<img src="wide.png">"#, "wide.png", 2000);
    let fit = control(&doc, viewer, DisplayMode::AutoFit);
    let before = doc.outer_html(viewer);

    let dispatch = click(&mut engine, &mut doc, fit, 100);

    assert!(dispatch.default_prevented);
    assert!(!dispatch.handled);
    assert_eq!(doc.outer_html(viewer), before);
    assert!(engine.take_signals().is_empty());
}

#[test]
fn test_image_click_cycles_and_wraps() {
    let (mut doc, mut engine, viewer) = with_viewer(2.0, r#"<img src="wide.png">"#, "wide.png", 2000);
    let img = engine.viewers()[0].images[0];

    let mut seen = Vec::new();
    for step in 0..3 {
        let dispatch = click(&mut engine, &mut doc, img, 100 + step * 10);
        assert_eq!(dispatch, Dispatch::consumed());
        seen.push(selected_mode(&doc, viewer).unwrap());
    }

    assert_eq!(
        seen,
        vec![
            DisplayMode::ActualSize,
            DisplayMode::RetinaHalved,
            DisplayMode::AutoFit
        ]
    );
    assert_eq!(rendered_width(&doc, viewer), "100%");
    let taps = engine
        .take_signals()
        .into_iter()
        .filter(|s| *s == Signal::ImageTapped)
        .count();
    assert_eq!(taps, 3);
}

#[test]
fn test_linked_image_click_cycles_instead_of_navigating() {
    let (mut doc, mut engine, viewer) = with_viewer(
        1.0,
        r#"<a href="https://example.com/photo"><img src="wide.png"></a>"#,
        "wide.png",
        2000,
    );
    assert_eq!(engine.viewers()[0].link.as_deref(), Some("https://example.com/photo"));

    let img = engine.viewers()[0].images[0];
    let dispatch = click(&mut engine, &mut doc, img, 100);
    assert!(dispatch.default_prevented);
    assert_eq!(selected_mode(&doc, viewer), Some(DisplayMode::ActualSize));

    let strip = doc.children(viewer).last().copied().unwrap();
    let anchor = doc.children(strip)[0];
    assert_eq!(doc.attr(anchor, "href"), Some("https://example.com/photo"));
    let dispatch = click(&mut engine, &mut doc, anchor, 200);
    assert_eq!(dispatch, Dispatch::passthrough());
    assert_eq!(selected_mode(&doc, viewer), Some(DisplayMode::ActualSize));
}

#[test]
fn test_click_outside_viewer_is_ignored() {
    let (mut doc, mut engine, _) = with_viewer(
        1.0,
        r#"<p><a href="/other">other</a></p><img src="wide.png">"#,
        "wide.png",
        2000,
    );
    let other = doc
        .find_first(doc.root(), |d, n| d.attr(n, "href") == Some("/other"))
        .unwrap();
    assert_eq!(click(&mut engine, &mut doc, other, 100), Dispatch::ignored());
}

#[test]
fn test_overlay_hides_after_quiet_period() {
    let (mut doc, mut engine, viewer) = with_viewer(1.0, r#"<img src="wide.png">"#, "wide.png", 2000);
    let menu = engine.viewers()[0].menu;

    engine.handle_event(&mut doc, &Event::MouseMoved, ms(3000)).unwrap();
    assert!(doc.has_class(menu, classes::FADE_IN));

    // Scroll at 1.5 s restarts the quiet period
    engine.handle_event(&mut doc, &Event::Scroll, ms(4500)).unwrap();
    engine.tick(&mut doc, ms(5000)).unwrap();
    assert!(engine.overlay().is_visible());

    engine.tick(&mut doc, ms(6499)).unwrap();
    assert!(doc.has_class(menu, classes::FADE_IN));
    engine.tick(&mut doc, ms(6500)).unwrap();
    assert!(doc.has_class(menu, classes::FADE_OUT));
    assert!(!engine.overlay().is_visible());
    assert!(doc.has_class(viewer, classes::VIEWER));
}

#[test]
fn test_retina_mode_uses_detected_width_right_away() {
    let mut doc = article(r#"<img src="wide.png">"#);
    let original = image_by_src(&doc, "wide.png");
    let mut engine = engine(600.0, 2.0);
    let mut images = KnownImages::new();
    scanned(&mut engine, &mut doc, &mut images);
    engine
        .image_loaded(
            &mut doc,
            original,
            crate::media::LoadStatus::Complete { natural_width: 1800 },
            &mut images,
            ms(10),
        )
        .unwrap();

    let viewer = engine.viewers()[0].root;
    let copy = engine.viewers()[0].images[0];
    assert!(engine.waiting_images().contains(&copy));
    assert_eq!(doc.attr(copy, attrs::NATURAL_WIDTH), Some("1800"));

    let retina = control(&doc, viewer, DisplayMode::RetinaHalved);
    click(&mut engine, &mut doc, retina, 20);
    assert_eq!(rendered_width(&doc, viewer), "900px");

    // The probe result replaces the detected width
    engine
        .image_loaded(
            &mut doc,
            copy,
            crate::media::LoadStatus::Complete { natural_width: 1600 },
            &mut images,
            ms(30),
        )
        .unwrap();
    assert_eq!(doc.attr(copy, attrs::NATURAL_WIDTH), Some("1600"));
    assert_eq!(rendered_width(&doc, viewer), "800px");
}
