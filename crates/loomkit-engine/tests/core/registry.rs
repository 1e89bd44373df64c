use std::sync::Arc;

use loomkit_core::{Point, Result};
use loomkit_engine::patterns::cross_stitch::CrossStitchRenderer;
use loomkit_engine::{
    PatternConfig, PatternRegistry, PatternRenderer, RenderOptions, RenderOutcome, StitchPath,
    Surface, SurfaceFormat,
};

fn same(a: &Arc<dyn PatternRenderer>, b: &Arc<dyn PatternRenderer>) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

struct Seed;

impl PatternRenderer for Seed {
    fn id(&self) -> &'static str {
        "seed-stitch"
    }

    fn aliases(&self) -> &[&'static str] {
        &["seed"]
    }

    fn render(
        &self,
        _surface: &mut Surface,
        path: &StitchPath,
        _config: &PatternConfig,
        _options: &RenderOptions,
    ) -> Result<RenderOutcome> {
        Ok(RenderOutcome { units: path.len() })
    }
}

#[test]
fn test_alias_spellings_share_one_renderer() {
    let registry = PatternRegistry::with_builtins();
    let a = registry.resolve("zigzag", None);
    let b = registry.resolve("zig-zag", None);
    let c = registry.resolve("Zig_Zag", None);
    assert!(!a.fallback);
    assert!(same(&a.renderer, &b.renderer));
    assert!(same(&a.renderer, &c.renderer));
    assert_eq!(a.renderer.id(), "zigzag");
}

#[test]
fn test_custom_renderer_resolves_by_alias() {
    let mut registry = PatternRegistry::with_builtins();
    let before = registry.len();
    assert!(!registry.register(Arc::new(Seed)));
    assert_eq!(registry.len(), before + 1);

    let resolved = registry.resolve("seed", None);
    assert!(!resolved.fallback);
    assert_eq!(resolved.renderer.id(), "seed-stitch");
    assert!(registry.declared_types().contains(&"seed"));

    // registering the same identifier again replaces in place
    assert!(registry.register(Arc::new(Seed)));
    assert_eq!(registry.len(), before + 1);
}

#[test]
fn test_unknown_type_falls_back_to_outline() {
    let registry = PatternRegistry::with_builtins();
    let resolved = registry.resolve("basketweave", None);
    assert!(resolved.fallback);
    assert_eq!(resolved.renderer.id(), "outline");
}

#[test]
fn test_single_point_paths_draw_nothing() {
    let registry = PatternRegistry::with_builtins();
    let single = StitchPath::new(vec![Point::new(10.0, 10.0)]);
    let mut names: Vec<&str> = registry.pattern_ids();
    names.push("no-such-pattern");

    for name in names {
        let renderer = registry.resolve(name, None).renderer;
        let mut surface = Surface::new(20, 20, SurfaceFormat::Rgba8).unwrap();
        let config = PatternConfig::new(name);
        let outcome = renderer
            .render(&mut surface, &single, &config, &RenderOptions::default())
            .unwrap();
        assert_eq!(outcome.units, 0, "{}", name);
        assert!(surface.is_clear(), "{} drew on a one-point path", name);
    }
}

#[test]
fn test_builtins_draw_on_an_open_triangle() {
    let registry = PatternRegistry::with_builtins();
    // fill needs three points
    let line = StitchPath::new(vec![
        Point::new(5.0, 50.0),
        Point::new(30.0, 8.0),
        Point::new(55.0, 50.0),
    ]);
    for name in registry.pattern_ids() {
        let renderer = registry.resolve(name, None).renderer;
        let mut surface = Surface::new(60, 60, SurfaceFormat::Rgba8).unwrap();
        let config = PatternConfig::new(name).with_thickness(6.0);
        let outcome = renderer
            .render(&mut surface, &line, &config, &RenderOptions::default())
            .unwrap();
        assert!(outcome.units > 0, "{} drew no units", name);
        assert!(!surface.is_clear(), "{} left the surface clear", name);
    }
}

#[test]
fn test_cross_stitch_count_follows_step() {
    let renderer = CrossStitchRenderer;
    let path = StitchPath::new(vec![Point::new(0.0, 10.0), Point::new(100.0, 10.0)]);
    let config = PatternConfig::new("cross-stitch").with_thickness(5.0);
    let step = CrossStitchRenderer::step(5.0);
    let expected = (100.0 / step).ceil() as i64;

    let mut surface = Surface::new(110, 20, SurfaceFormat::Rgba8).unwrap();
    let outcome = renderer
        .render(&mut surface, &path, &config, &RenderOptions::default())
        .unwrap();
    assert!((outcome.units as i64 - expected).abs() <= 1, "units {}", outcome.units);
}

#[test]
fn test_invalid_config_is_rejected() {
    let registry = PatternRegistry::with_builtins();
    let renderer = registry.resolve("satin", None).renderer;
    let config = PatternConfig::new("satin").with_thickness(0.0);
    assert!(renderer.validate_config(&config).is_err());
    let config = PatternConfig::new("satin").with_opacity(1.5);
    assert!(renderer.validate_config(&config).is_err());
}
