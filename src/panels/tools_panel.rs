use crate::BoardApp;
use crate::color::{MAX_BRUSH_SIZE, MIN_BRUSH_SIZE, parse_css_color, to_hex};
use crate::components::tool_button::ToolButton;
use crate::layer::LayerContent;
use crate::state::{Action, Mode};

pub fn tools_panel(app: &mut BoardApp, ctx: &egui::Context) {
    egui::SidePanel::left("tools_panel")
        .resizable(true)
        .default_width(200.0)
        .show(ctx, |ui| {
            ui.heading("Tools");

            let mut actions = Vec::new();
            let state = app.engine.state();

            ui.horizontal(|ui| {
                for mode in [Mode::Draw, Mode::Erase, Mode::Move] {
                    if ToolButton::new(mode, state.mode == mode).show(ui).clicked() {
                        log::info!("Tool selected from UI: {mode:?}");
                        actions.push(Action::SetMode(mode));
                    }
                }
            });
            ui.separator();

            ui.horizontal(|ui| {
                ui.label("Color");
                let [r, g, b, a] = parse_css_color(&state.stroke_color).0;
                let mut color = egui::Color32::from_rgba_unmultiplied(r, g, b, a);
                if ui.color_edit_button_srgba(&mut color).changed() {
                    let [r, g, b, a] = color.to_srgba_unmultiplied();
                    actions.push(Action::SetStrokeColor(to_hex(image::Rgba([r, g, b, a]))));
                }
            });

            let mut size = state.brush_size;
            if ui
                .add(egui::Slider::new(&mut size, MIN_BRUSH_SIZE..=MAX_BRUSH_SIZE).text("Brush"))
                .changed()
            {
                actions.push(Action::SetBrushSize(size));
            }

            let background = state.layers.iter().find_map(|layer| match &layer.content {
                LayerContent::Background { color } => Some(color.clone()),
                _ => None,
            });
            if let Some(background) = background {
                ui.horizontal(|ui| {
                    ui.label("Background");
                    let [r, g, b, _] = parse_css_color(&background).0;
                    let mut rgb = [r, g, b];
                    if ui.color_edit_button_srgb(&mut rgb).changed() {
                        let [r, g, b] = rgb;
                        actions.push(Action::SetBackgroundColor {
                            color: to_hex(image::Rgba([r, g, b, 255])),
                        });
                    }
                });
            }
            ui.separator();

            // Undo/Redo section
            ui.horizontal(|ui| {
                if ui.add_enabled(state.can_undo(), egui::Button::new("Undo")).clicked() {
                    actions.push(Action::Undo);
                }
                if ui.add_enabled(state.can_redo(), egui::Button::new("Redo")).clicked() {
                    actions.push(Action::Redo);
                }
            });
            ui.horizontal(|ui| {
                ui.label(format!("Undo stack size: {}", state.past().len()));
                ui.label(format!("Redo stack size: {}", state.future().len()));
            });
            ui.separator();

            ui.heading("Image");
            ui.text_edit_singleline(&mut app.image_source);
            let source = app.image_source.trim().to_string();
            let status = app.engine.image_status(&source);
            ui.horizontal(|ui| {
                if ui.add_enabled(!source.is_empty(), egui::Button::new("Insert")).clicked() {
                    app.engine.insert_image(&source, None);
                }
                if ui.add_enabled(status.is_some(), egui::Button::new("Reload")).clicked() {
                    app.engine.reload_image(&source);
                }
            });
            if let Some(status) = status {
                ui.label(format!("{status:?}"));
            }
            ui.separator();

            if ui.button("Refresh composite").clicked() {
                match app.engine.refresh_composite_data_url() {
                    Ok(url) => log::info!("composite refreshed ({} chars)", url.len()),
                    Err(err) => log::warn!("composite failed: {err}"),
                }
            }

            for action in actions {
                app.engine.dispatch(action);
            }
        });
}
