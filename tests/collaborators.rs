use std::cell::RefCell;
use std::rc::Rc;

use egui::vec2;
use futures::executor::block_on;
use futures::future::{self, BoxFuture, FutureExt};
use layerboard::persistence::{self, BoardDocument};
use layerboard::state::Action;
use layerboard::{BoardEngine, CollaboratorError, EngineError, ImageGenerator, LayerContent, Stroke, Uploader};

struct MockGenerator {
    response: Result<String, String>,
    prompts: RefCell<Vec<String>>,
}

impl MockGenerator {
    fn returning(response: Result<&str, &str>) -> Self {
        Self {
            response: response.map(str::to_string).map_err(str::to_string),
            prompts: RefCell::default(),
        }
    }
}

impl ImageGenerator for MockGenerator {
    fn generate(&self, composite_png: Vec<u8>, prompt: String) -> BoxFuture<'static, Result<String, CollaboratorError>> {
        assert!(composite_png.starts_with(b"\x89PNG"));
        self.prompts.borrow_mut().push(prompt);
        let response = self.response.clone().map_err(CollaboratorError::Transport);
        future::ready(response).boxed()
    }
}

struct MockUploader {
    url: String,
}

impl Uploader for MockUploader {
    fn upload(&self, blob: Vec<u8>, content_type: &'static str) -> BoxFuture<'static, Result<String, CollaboratorError>> {
        assert!(!blob.is_empty());
        assert_eq!(content_type, "image/png");
        future::ready(Ok(self.url.clone())).boxed()
    }
}

fn engine() -> BoardEngine {
    let mut engine = BoardEngine::default();
    engine.resize(vec2(64.0, 48.0), 2.0);
    engine.dispatch(Action::CommitStroke {
        stroke: Stroke::new("#0000ff", 4.0, false, vec![4.0, 4.0, 40.0, 30.0]),
    });
    engine
}

#[test]
fn test_generation_failure_leaves_board_untouched() {
    let mut engine = engine();
    let before = engine.state().snapshot();
    let revision = engine.state().revision();
    let generator = MockGenerator::returning(Err("offline"));

    let result = block_on(engine.generate_from_prompt(&generator, "a cat"));

    assert!(matches!(result, Err(EngineError::Collaborator(CollaboratorError::Transport(_)))));
    assert_eq!(engine.state().snapshot(), before);
    assert_eq!(engine.state().revision(), revision);
    assert_eq!(*generator.prompts.borrow(), vec!["a cat".to_string()]);
}

#[test]
fn test_generation_adds_image_and_drawing_layer() {
    let mut engine = engine();
    let generator = MockGenerator::returning(Ok("https://example.com/generated.png"));

    let image_id = block_on(engine.generate_from_prompt(&generator, "a cat")).unwrap();

    let layers = &engine.state().layers;
    let top = layers.last().unwrap();
    let image = &layers[layers.len() - 2];
    assert!(top.is_vector());
    assert_eq!(engine.state().active_layer_id, top.id);
    assert_eq!(image.id, image_id);
    assert_eq!(image.name, "Generated");
    match &image.content {
        LayerContent::Image { src, banana, bounds } => {
            assert_eq!(src, "https://example.com/generated.png");
            assert!(*banana);
            assert!(bounds.is_none());
        }
        other => panic!("expected an image layer, got {other:?}"),
    }
}

#[test]
fn test_empty_generation_is_rejected() {
    let mut engine = engine();
    let before = engine.state().snapshot();
    let generator = MockGenerator::returning(Ok("   "));

    let result = block_on(engine.generate_from_prompt(&generator, "nothing"));

    assert!(matches!(result, Err(EngineError::Collaborator(CollaboratorError::EmptyResponse))));
    assert_eq!(engine.state().snapshot(), before);
}

#[test]
fn test_generation_needs_a_canvas() {
    let mut engine = BoardEngine::default();
    let generator = MockGenerator::returning(Ok("https://example.com/x.png"));

    let result = block_on(engine.generate_from_prompt(&generator, "a cat"));

    assert!(matches!(result, Err(EngineError::EmptyCanvas)));
    assert!(generator.prompts.borrow().is_empty());
}

#[test]
fn test_upload_inserts_aspect_fit_image() {
    let mut engine = engine();
    let uploader = MockUploader {
        url: "https://cdn.example.com/photo.png".into(),
    };
    let blob = engine.composite_png().unwrap();

    let id = block_on(engine.upload_image(&uploader, blob, "image/png", Some("Photo".into()))).unwrap();

    let layer = engine.state().layer(&id).unwrap();
    assert_eq!(layer.name, "Photo");
    assert!(matches!(layer.content, LayerContent::Image { banana: false, .. }));
    assert_eq!(engine.state().active_layer_id, id);
}

#[test]
fn test_thumbnail_is_bounded() {
    let mut engine = engine();
    let uploader = MockUploader {
        url: "https://cdn.example.com/thumb.png".into(),
    };

    let png = engine.thumbnail_png().unwrap();
    let thumbnail = image::load_from_memory(&png).unwrap();
    let edge = engine.config().thumbnail_edge;
    assert!(thumbnail.width() <= edge && thumbnail.height() <= edge);

    let url = block_on(engine.upload_thumbnail(&uploader).unwrap()).unwrap();
    assert_eq!(url, "https://cdn.example.com/thumb.png");
}

#[test]
fn test_composite_data_url_is_cached_on_the_board() {
    let mut engine = engine();

    let url = engine.refresh_composite_data_url().unwrap();

    assert!(url.starts_with("data:image/png;base64,"));
    assert_eq!(engine.state().composite_data_url.as_deref(), Some(url.as_str()));
}

#[test]
fn test_sink_sees_every_layer_change() {
    let saved: Rc<RefCell<Vec<BoardDocument>>> = Rc::default();
    let mut engine = engine();
    let log = saved.clone();
    engine.subscribe(Box::new(move |document: &BoardDocument| {
        log.borrow_mut().push(document.clone());
    }));

    engine.dispatch(Action::AddLayer { name: None });
    engine.dispatch(Action::SetBrushSize(12.0));
    engine.dispatch(Action::Undo);

    let saved = saved.borrow();
    assert_eq!(saved.len(), 2);
    assert_eq!(saved[1], engine.save());
}

#[test]
fn test_saved_board_round_trips() {
    let mut engine = engine();
    engine.insert_image("https://example.com/a.png", None);
    let id = engine.state().active_layer_id.clone();
    engine.dispatch(Action::SetImageBounds {
        id,
        bounds: egui::Rect::from_min_size(egui::pos2(3.0, 4.0), vec2(20.0, 10.0)),
    });
    let text = engine.save_json();

    let mut restored = BoardEngine::default();
    restored.load_json(&text);

    assert_eq!(restored.save_json(), text);
    assert_eq!(persistence::load(&text).len(), engine.state().layers.len());
}
