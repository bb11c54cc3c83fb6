use crate::BoardApp;
use crate::layer::LayerId;
use crate::state::Action;

pub fn layers_panel(app: &mut BoardApp, ctx: &egui::Context) {
    egui::SidePanel::right("layers_panel")
        .resizable(true)
        .default_width(220.0)
        .show(ctx, |ui| {
            ui.heading("Layers");

            let state = app.engine.state();
            let active = state.active_layer_id.clone();
            // Top-to-bottom, which is how the list reads on screen.
            let order: Vec<LayerId> = state
                .layers
                .iter()
                .rev()
                .filter(|layer| !layer.is_background())
                .map(|layer| layer.id.clone())
                .collect();

            let mut actions = Vec::new();
            ui.horizontal(|ui| {
                if ui.button("Add").clicked() {
                    actions.push(Action::AddLayer { name: None });
                }
                if ui.button("Clear layer").clicked() {
                    actions.push(Action::ClearLayer { id: active.clone() });
                }
                if ui.button("Clear all").clicked() {
                    actions.push(Action::ClearAll);
                }
            });
            ui.separator();

            egui::ScrollArea::vertical().show(ui, |ui| {
                for layer in state.layers.iter().rev() {
                    ui.horizontal(|ui| {
                        let mut visible = layer.visible;
                        if ui.checkbox(&mut visible, "").changed() {
                            actions.push(Action::ToggleLayerVisibility { id: layer.id.clone() });
                        }
                        let label = format!("{} ({})", layer.name, layer.kind_name());
                        if ui.selectable_label(layer.id == active, label).clicked() {
                            actions.push(Action::SelectLayer { id: layer.id.clone() });
                        }
                        if layer.is_background() {
                            return;
                        }
                        let Some(index) = order.iter().position(|id| id == &layer.id) else {
                            return;
                        };
                        if ui.add_enabled(index > 0, egui::Button::new("⬆")).clicked() {
                            let mut reordered = order.clone();
                            reordered.swap(index, index - 1);
                            actions.push(Action::ReorderLayers { top_to_bottom: reordered });
                        }
                        if ui
                            .add_enabled(index + 1 < order.len(), egui::Button::new("⬇"))
                            .clicked()
                        {
                            let mut reordered = order.clone();
                            reordered.swap(index, index + 1);
                            actions.push(Action::ReorderLayers { top_to_bottom: reordered });
                        }
                        if ui.button("🗑").clicked() {
                            actions.push(Action::RemoveLayer { id: layer.id.clone() });
                        }
                    });
                }
            });
            ui.separator();

            ui.horizontal(|ui| {
                ui.text_edit_singleline(&mut app.rename_buffer);
                let name = app.rename_buffer.trim();
                if ui.add_enabled(!name.is_empty(), egui::Button::new("Rename")).clicked() {
                    actions.push(Action::RenameLayer {
                        id: active.clone(),
                        name: name.to_string(),
                    });
                }
            });

            let renamed = actions.iter().any(|action| matches!(action, Action::RenameLayer { .. }));
            for action in actions {
                log::debug!("layers panel: {}", action.name());
                app.engine.dispatch(action);
            }
            if renamed {
                app.rename_buffer.clear();
            }
        });
}
