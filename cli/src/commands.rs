use std::io::Write;
use std::path::PathBuf;

use serde::Serialize;
use serde_json::{Map, Number, Value};
use watermark_core::{OptionsProvider, OverlayRenderState, colors};
use watermark_types::{Color, OverlaySize, WatermarkOptions};

use crate::CliContext;
use crate::surface::HeadlessView;

pub fn open(ctx: &mut CliContext, path: Option<PathBuf>, width: f64, height: f64) {
    let id = ctx.open_surface(path, width, height);
    println!("opened surface {id}");
}

pub fn close(ctx: &mut CliContext, id: u32) -> Result<(), String> {
    ctx.close_surface(id)?;
    println!("closed surface {id}");
    Ok(())
}

pub fn resize(ctx: &CliContext, id: u32, width: f64, height: f64) -> Result<(), String> {
    if !(width >= 0.0 && height >= 0.0) {
        return Err("width and height must not be negative".to_string());
    }
    ctx.surface(id)?.resize(width, height);
    Ok(())
}

/// Pin the measured size of a surface's content, or return it to the
/// estimate when no size is given
pub fn measure(
    ctx: &CliContext,
    id: u32,
    width: Option<f64>,
    height: Option<f64>,
) -> Result<(), String> {
    let size = match (width, height) {
        (Some(width), Some(height)) => Some(OverlaySize::new(width, height)),
        (None, None) => None,
        _ => return Err("give both width and height, or neither".to_string()),
    };
    ctx.surface(id)?.measure(size);
    Ok(())
}

/// Rename the document shown in a surface.
///
/// Tokens only name a surface's own document, so the rename event refreshes
/// that overlay alone.
pub fn rename(ctx: &CliContext, id: u32, path: PathBuf) -> Result<(), String> {
    ctx.surface(id)?.rename(path);
    Ok(())
}

pub fn set(ctx: &CliContext, field: &str, value: &str) -> Result<(), String> {
    ensure_loaded(ctx)?;
    let current = ctx.store.snapshot().unwrap_or_default();
    let updated = set_option(&current, field, value)?;
    ctx.store.save(&updated).map_err(|e| e.to_string())?;
    ctx.broadcast_refresh();
    Ok(())
}

pub fn reset(ctx: &CliContext) -> Result<(), String> {
    ctx.store
        .save(&WatermarkOptions::default())
        .map_err(|e| e.to_string())?;
    ctx.broadcast_refresh();
    println!("options reset to defaults");
    Ok(())
}

pub fn refresh(ctx: &CliContext) {
    ctx.broadcast_refresh();
}

#[derive(Serialize)]
struct SurfaceReport {
    id: u32,
    document: Option<PathBuf>,
    state: OverlayRenderState,
    view: HeadlessView,
}

pub fn show(ctx: &CliContext, id: u32) -> Result<(), String> {
    let surface = ctx.surface(id)?;
    let report = SurfaceReport {
        id,
        document: surface.document.borrow().clone(),
        state: surface.controller.state(),
        view: surface.view.borrow().clone(),
    };
    let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(())
}

pub fn color(spec: Option<&str>, list: bool) -> Result<(), String> {
    if list {
        let mut names: Vec<_> = colors::named_colors().collect();
        names.sort_unstable();
        for (name, hex) in names {
            println!("{name:<24} {hex}");
        }
        return Ok(());
    }

    let spec = spec.ok_or("give a color, or --list")?;
    match colors::resolve(spec) {
        Some(color) => {
            println!("{spec} => {}", format_color(color));
            Ok(())
        }
        None => Err(format!("'{spec}' is not a known color name or hex value")),
    }
}

pub fn show_config(ctx: &CliContext) -> Result<(), String> {
    match ctx.store.config_path() {
        Ok(path) => println!("file:  {}", path.display()),
        Err(e) => println!("file:  unavailable ({e})"),
    }
    println!("ready: {}", ctx.store.is_ready());

    if let Ok(options) = ctx.store.snapshot() {
        let json = serde_json::to_string_pretty(&options).map_err(|e| e.to_string())?;
        println!("{json}");
    }
    Ok(())
}

pub fn list_surfaces(ctx: &CliContext) {
    let mut any = false;
    println!("{:<4} {:<10} {:<40} Text", "Id", "Phase", "Document");
    println!("{}", "-".repeat(80));
    for surface in ctx.surfaces() {
        any = true;
        let state = surface.controller.state();
        println!(
            "{:<4} {:<10} {:<40} {}",
            surface.id,
            format!("{:?}", state.phase),
            surface.document_label(),
            state.text
        );
    }
    if !any {
        println!("no open surfaces");
    }
}

pub fn exit() -> Result<(), String> {
    write!(std::io::stdout(), "quitting...").map_err(|e| e.to_string())?;
    std::io::stdout().flush().map_err(|e| e.to_string())
}

// ─────────────────────────────────────────────────────────────────────────────
// Helpers
// ─────────────────────────────────────────────────────────────────────────────

/// Load the options file now if the background load has not finished, so an
/// edit never overwrites the file with defaults
fn ensure_loaded(ctx: &CliContext) -> Result<(), String> {
    if ctx.store.is_ready() {
        return Ok(());
    }
    ctx.store
        .load_blocking()
        .map(|_| ())
        .map_err(|e| e.to_string())
}

/// Copy of `options` with one field (by its file name) parsed from `value`
pub fn set_option(
    options: &WatermarkOptions,
    field: &str,
    value: &str,
) -> Result<WatermarkOptions, String> {
    let mut json = serde_json::to_value(options).map_err(|e| e.to_string())?;
    let map: &mut Map<String, Value> = json
        .as_object_mut()
        .ok_or("options did not serialize to a table")?;

    let parsed = match map.get(field) {
        Some(Value::Bool(_)) => Value::Bool(parse_bool(value)?),
        Some(Value::Number(_)) => {
            let number: f64 = value
                .trim()
                .parse()
                .map_err(|_| format!("'{value}' is not a number"))?;
            Number::from_f64(number)
                .map(Value::Number)
                .ok_or_else(|| format!("'{value}' is not a finite number"))?
        }
        Some(_) => Value::String(value.to_string()),
        None => {
            let known: Vec<&str> = map.keys().map(String::as_str).collect();
            return Err(format!(
                "unknown option '{field}', expected one of: {}",
                known.join(", ")
            ));
        }
    };
    map.insert(field.to_string(), parsed);

    serde_json::from_value(json).map_err(|e| e.to_string())
}

fn parse_bool(value: &str) -> Result<bool, String> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(format!("'{value}' is not true or false")),
    }
}

fn format_color([r, g, b, a]: Color) -> String {
    format!("#{a:02X}{r:02X}{g:02X}{b:02X} (r={r}, g={g}, b={b}, a={a})")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_option_by_type() {
        let options = WatermarkOptions::default();

        let updated = set_option(&options, "position_top", "yes").unwrap();
        assert!(updated.position_top);

        let updated = set_option(&updated, "text_size", "24").unwrap();
        assert_eq!(updated.text_size, 24.0);

        let updated = set_option(&updated, "displayed_text", "${currentFileName}").unwrap();
        assert_eq!(updated.displayed_text, "${currentFileName}");
        assert!(updated.position_top);
    }

    #[test]
    fn test_set_option_rejects_bad_input() {
        let options = WatermarkOptions::default();
        assert!(set_option(&options, "no_such_field", "1").unwrap_err().contains("text_color"));
        assert!(set_option(&options, "text_size", "big").is_err());
        assert!(set_option(&options, "text_size", "NaN").is_err());
        assert!(set_option(&options, "enabled", "maybe").is_err());
    }

    #[test]
    fn test_color_strings_pass_through_unvalidated() {
        // The engine reports unknown colors per refresh; the store keeps them
        let updated = set_option(&WatermarkOptions::default(), "text_color", "Blorange").unwrap();
        assert_eq!(updated.text_color, "Blorange");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_rename_refreshes_only_that_surface() {
        use std::cell::Cell;
        use std::rc::Rc;
        use watermark_core::ConfigStore;

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.toml");
        std::fs::write(&path, "displayed_text = \"${currentFileName}\"\n").unwrap();
        let mut ctx = CliContext::new(ConfigStore::at_path(
            &path,
            tokio::runtime::Handle::current(),
        ));
        ctx.store.load_blocking().unwrap();

        let renamed = ctx.open_surface(Some(PathBuf::from("/proj/old.rs")), 800.0, 400.0);
        let other = ctx.open_surface(Some(PathBuf::from("/proj/other.rs")), 800.0, 400.0);

        let broadcasts = Rc::new(Cell::new(0));
        let counter = Rc::clone(&broadcasts);
        ctx.refresh_bus.subscribe(move |_| counter.set(counter.get() + 1));
        ctx.surface(other).unwrap().view.borrow_mut().text = "untouched".to_string();

        rename(&ctx, renamed, PathBuf::from("/proj/new.rs")).unwrap();

        assert_eq!(broadcasts.get(), 0);
        assert_eq!(ctx.surface(renamed).unwrap().controller.state().text, "new.rs");
        assert_eq!(ctx.surface(other).unwrap().view.borrow().text, "untouched");
        assert!(rename(&ctx, 99, PathBuf::from("/x.rs")).is_err());
    }

    #[test]
    fn test_format_color() {
        assert_eq!(
            format_color([255, 0, 0, 128]),
            "#80FF0000 (r=255, g=0, b=0, a=128)"
        );
    }
}
