use egui::{Event, PointerButton, Pos2, Rect};

use crate::BoardApp;
use crate::input::{CaptureChange, InputResponse, PointerInput};

pub fn central_panel(app: &mut BoardApp, ctx: &egui::Context) {
    egui::CentralPanel::default()
        .frame(egui::Frame::none())
        .show(ctx, |ui| {
            let available_size = ui.available_size();
            let (response, painter) = ui.allocate_painter(available_size, egui::Sense::click_and_drag());
            let rect = response.rect;

            app.engine.resize(rect.size(), ctx.pixels_per_point());
            handle_input(app, ctx, rect);
            app.paint_canvas(ctx, &painter, rect);
        });
}

fn handle_input(app: &mut BoardApp, ctx: &egui::Context, rect: Rect) {
    let wants_keyboard = ctx.wants_keyboard_input();
    let (events, modifiers) = ctx.input(|i| (i.events.clone(), i.modifiers));
    let local = |pos: Pos2| (pos - rect.min).to_pos2();

    for event in events {
        let response = match event {
            Event::PointerButton {
                pos,
                button,
                pressed: true,
                modifiers,
            } if rect.contains(pos) => {
                let input = mouse_input(local(pos), Some(button), modifiers);
                app.engine.pointer_down(&input)
            }
            Event::PointerButton {
                pos,
                button,
                pressed: false,
                modifiers,
            } if app.captured.is_some() => {
                let input = mouse_input(local(pos), Some(button), modifiers);
                app.engine.pointer_up(&input)
            }
            Event::PointerMoved(pos) if app.captured.is_some() => {
                let input = mouse_input(local(pos), None, modifiers);
                app.engine.pointer_move(&input)
            }
            Event::PointerGone => match app.captured {
                Some(pointer_id) => app.engine.lost_capture(pointer_id),
                None => InputResponse::ignored(),
            },
            Event::Key {
                key,
                pressed: true,
                modifiers,
                ..
            } if !wants_keyboard => app.engine.key_down(key, modifiers),
            _ => InputResponse::ignored(),
        };
        match response.capture {
            Some(CaptureChange::Acquire(pointer_id)) => app.captured = Some(pointer_id),
            Some(CaptureChange::Release(_)) => app.captured = None,
            None => {}
        }
    }

    // The gesture may have ended without a release of ours, e.g. a lost capture.
    if app.captured.is_some() && !app.engine.is_gesture_active() {
        app.captured = None;
    }
}

fn mouse_input(pos: Pos2, button: Option<PointerButton>, modifiers: egui::Modifiers) -> PointerInput {
    PointerInput::mouse(pos)
        .with_button(button)
        .with_modifiers(modifiers)
}
