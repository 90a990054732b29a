//! Image selection, decoding and rendering as an explicit state machine.
//!
//! Every selection gets a new generation number. Decode completions carry the
//! generation they were started for, and anything but the newest is dropped,
//! so a slow decode can never overwrite a newer selection.

use std::path::Path;
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::Arc;
use std::thread;

use log::{debug, info, warn};

use crate::ascii::grid::RenderedArt;
use crate::canvas::Canvas;
use crate::image_pipeline::buffer::PixelBuffer;
use crate::image_pipeline::loader::{ImageSource, SampleCatalog};
use crate::image_pipeline::resize::Preprocess;
use crate::{GlyphRenderer, RenderError};

pub type Generation = u64;

/// Shown while nothing has been rendered yet or after a decode failure.
pub const PLACEHOLDER_MESSAGE: &str = "select an image file to process";

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Loading { generation: Generation },
    Ready,
    Rendering,
}

#[derive(Debug)]
pub enum SessionEvent {
    FileSelected { generation: Generation },
    DecodeCompleted(DecodeCompletion),
    RenderRequested,
    RenderCompleted(Result<RenderedArt, RenderError>),
}

/// Outcome of a decode started for `generation`.
#[derive(Debug)]
pub struct DecodeCompletion {
    pub generation: Generation,
    pub result: Result<PixelBuffer, RenderError>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Transition {
    Moved { from: SessionState, to: SessionState },
    /// Completion for a selection that has since been replaced.
    Stale,
    Ignored,
}

#[derive(Debug)]
pub struct Session {
    state: SessionState,
    latest: Generation,
    image: Option<Arc<PixelBuffer>>,
    art: Option<RenderedArt>,
    message: Option<String>,
    render_on_load: bool,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    pub fn new() -> Self {
        Self {
            state: SessionState::Idle,
            latest: 0,
            image: None,
            art: None,
            message: Some(PLACEHOLDER_MESSAGE.to_owned()),
            render_on_load: false,
        }
    }

    /// Go straight to rendering whenever a decode finishes.
    pub fn render_on_load(mut self, enabled: bool) -> Self {
        self.render_on_load = enabled;
        self
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn image(&self) -> Option<&Arc<PixelBuffer>> {
        self.image.as_ref()
    }

    pub fn art(&self) -> Option<&RenderedArt> {
        self.art.as_ref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Allocate the generation for the next selection.
    pub fn next_generation(&mut self) -> Generation {
        self.latest += 1;
        self.latest
    }

    pub fn handle(&mut self, event: SessionEvent) -> Transition {
        let from = self.state;
        let to = match (from, event) {
            (_, SessionEvent::FileSelected { generation }) => {
                if generation < self.latest {
                    return Transition::Stale;
                }
                self.latest = generation;
                SessionState::Loading { generation }
            },
            (SessionState::Loading { generation }, SessionEvent::DecodeCompleted(completion)) => {
                if completion.generation != generation {
                    debug!(
                        "dropping decode for generation {} while loading {generation}",
                        completion.generation
                    );
                    return Transition::Stale;
                }
                match completion.result {
                    Ok(buffer) => self.finish_decode(buffer),
                    Err(err) => self.fail_decode(&err),
                }
            },
            (_, SessionEvent::DecodeCompleted(completion)) => {
                debug!(
                    "dropping decode for generation {} in state {from:?}",
                    completion.generation
                );
                return Transition::Stale;
            },
            (SessionState::Ready, SessionEvent::RenderRequested) => SessionState::Rendering,
            (SessionState::Rendering, SessionEvent::RenderCompleted(result)) => {
                match result {
                    Ok(art) => {
                        self.art = Some(art);
                        self.message = None;
                    },
                    Err(err) => {
                        warn!("render failed: {err}");
                        self.message = Some(err.to_string());
                    },
                }
                SessionState::Ready
            },
            (state, event) => {
                debug!("ignoring {event:?} in state {state:?}");
                return Transition::Ignored;
            },
        };

        self.state = to;
        Transition::Moved { from, to }
    }

    /// Record a failed decode for `generation` while keeping the error with the caller.
    pub fn decode_failed(&mut self, generation: Generation, err: &RenderError) -> Transition {
        let from = self.state;
        match from {
            SessionState::Loading { generation: current } if current == generation => {
                let to = self.fail_decode(err);
                self.state = to;
                Transition::Moved { from, to }
            },
            _ => {
                debug!("dropping failed decode for generation {generation} in state {from:?}");
                Transition::Stale
            },
        }
    }

    fn finish_decode(&mut self, buffer: PixelBuffer) -> SessionState {
        self.image = Some(Arc::new(buffer));
        self.message = None;
        if self.render_on_load {
            SessionState::Rendering
        } else {
            SessionState::Ready
        }
    }

    fn fail_decode(&mut self, err: &RenderError) -> SessionState {
        warn!("image could not be loaded: {err}");
        self.message = Some(PLACEHOLDER_MESSAGE.to_owned());
        if self.image.is_some() {
            SessionState::Ready
        } else {
            SessionState::Idle
        }
    }
}

/// Decodes and pre-processes images on background threads.
#[derive(Debug)]
pub struct Loader {
    sender: Sender<DecodeCompletion>,
    receiver: Receiver<DecodeCompletion>,
}

impl Default for Loader {
    fn default() -> Self {
        Self::new()
    }
}

impl Loader {
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self { sender, receiver }
    }

    /// Report a completion without spawning a decode.
    pub fn complete(&self, completion: DecodeCompletion) {
        // The receiver lives as long as `self`.
        let _ = self.sender.send(completion);
    }

    pub fn spawn(&self, generation: Generation, source: ImageSource, preprocess: Preprocess) {
        let sender = self.sender.clone();
        thread::spawn(move || {
            // Samples are resolved to paths before spawning.
            let result = source
                .acquire(&SampleCatalog::default())
                .and_then(|buffer| preprocess.apply(&buffer));
            let _ = sender.send(DecodeCompletion { generation, result });
        });
    }

    pub fn try_next(&self) -> Option<DecodeCompletion> {
        self.receiver.try_recv().ok()
    }

    pub fn next_blocking(&self) -> Option<DecodeCompletion> {
        self.receiver.recv().ok()
    }
}

/// Handle shared by whatever triggers loads, renders and exports.
#[derive(Debug)]
pub struct RenderContext {
    renderer: GlyphRenderer,
    session: Session,
    loader: Loader,
    catalog: SampleCatalog,
    canvas: Option<Canvas>,
}

impl RenderContext {
    pub fn new(renderer: GlyphRenderer) -> Self {
        Self {
            renderer,
            session: Session::new(),
            loader: Loader::new(),
            catalog: SampleCatalog::new(),
            canvas: None,
        }
    }

    pub fn with_catalog(mut self, catalog: SampleCatalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Paint every finished render onto `canvas`.
    pub fn with_canvas(mut self, canvas: Canvas) -> Self {
        self.canvas = Some(canvas);
        self
    }

    pub fn render_on_load(mut self, enabled: bool) -> Self {
        self.session = self.session.render_on_load(enabled);
        self
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn canvas(&self) -> Option<&Canvas> {
        self.canvas.as_ref()
    }

    pub fn art(&self) -> Option<&RenderedArt> {
        self.session.art()
    }

    /// Start loading `source`, superseding any load still in flight.
    pub fn select(&mut self, source: ImageSource) -> Generation {
        let generation = self.session.next_generation();
        self.session.handle(SessionEvent::FileSelected { generation });

        match source.resolve(&self.catalog) {
            Ok(source) => self.loader.spawn(generation, source, self.renderer.preprocess),
            Err(err) => self.loader.complete(DecodeCompletion { generation, result: Err(err) }),
        }

        generation
    }

    /// Apply every completion that has already arrived.
    pub fn poll(&mut self) -> usize {
        let mut applied = 0;
        while let Some(completion) = self.loader.try_next() {
            applied += 1;
            self.apply(completion);
        }
        applied
    }

    /// Block until the newest selection has finished decoding.
    pub fn wait(&mut self) {
        while matches!(self.session.state(), SessionState::Loading { .. }) {
            let Some(completion) = self.loader.next_blocking() else {
                return;
            };
            self.apply(completion);
        }
    }

    /// Select `source` and wait for it; returns the decode error, if any.
    pub fn load(&mut self, source: ImageSource) -> Result<(), RenderError> {
        let generation = self.select(source);
        while matches!(self.session.state(), SessionState::Loading { .. }) {
            let Some(completion) = self.loader.next_blocking() else {
                break;
            };
            let DecodeCompletion { generation: finished, result } = completion;
            match result {
                Err(err) if finished == generation => {
                    self.session.decode_failed(finished, &err);
                    return Err(err);
                },
                result => self.apply(DecodeCompletion { generation: finished, result }),
            }
        }
        Ok(())
    }

    fn apply(&mut self, completion: DecodeCompletion) {
        if let Transition::Moved { to: SessionState::Rendering, .. } =
            self.session.handle(SessionEvent::DecodeCompleted(completion))
        {
            self.run_render();
        }
    }

    /// Render the current image. Returns `None` when there is nothing to render.
    pub fn request_render(&mut self) -> Option<&RenderedArt> {
        match self.session.handle(SessionEvent::RenderRequested) {
            Transition::Moved { to: SessionState::Rendering, .. } => {
                self.run_render();
                self.session.art()
            },
            _ => None,
        }
    }

    fn run_render(&mut self) {
        let Some(image) = self.session.image().cloned() else {
            return;
        };

        let result = self.renderer.rasterize(&image).and_then(|art| {
            if let Some(canvas) = self.canvas.as_mut() {
                canvas.draw(&art)?;
            }
            Ok(art)
        });

        if let Ok(art) = &result {
            let grid = art.grid();
            info!("rendered {}x{} glyph grid", grid.width, grid.height);
        }
        self.session.handle(SessionEvent::RenderCompleted(result));
    }

    /// Write the canvas as a PNG file.
    pub fn export_png<P: AsRef<Path>>(&self, path: P) -> Result<(), RenderError> {
        let canvas = self
            .canvas
            .as_ref()
            .ok_or_else(|| RenderError::InvalidConfig("no canvas attached".into()))?;
        canvas.save_png(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn black(width: u32, height: u32) -> PixelBuffer {
        PixelBuffer::filled(width, height, [0, 0, 0, 255])
    }

    fn decoded(generation: Generation) -> SessionEvent {
        SessionEvent::DecodeCompleted(DecodeCompletion { generation, result: Ok(black(2, 2)) })
    }

    #[test]
    fn load_then_render_cycle() {
        let mut session = Session::new();
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.message(), Some(PLACEHOLDER_MESSAGE));

        let generation = session.next_generation();
        session.handle(SessionEvent::FileSelected { generation });
        assert_eq!(session.state(), SessionState::Loading { generation });

        session.handle(decoded(generation));
        assert_eq!(session.state(), SessionState::Ready);
        assert!(session.image().is_some());

        session.handle(SessionEvent::RenderRequested);
        assert_eq!(session.state(), SessionState::Rendering);

        let art = RenderedArt::Text(crate::GlyphGrid::new(1, 1, vec!['#']));
        session.handle(SessionEvent::RenderCompleted(Ok(art.clone())));
        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.art(), Some(&art));
        assert_eq!(session.message(), None);
    }

    #[test]
    fn stale_completions_are_discarded() {
        let mut session = Session::new();
        let first = session.next_generation();
        session.handle(SessionEvent::FileSelected { generation: first });
        let second = session.next_generation();
        session.handle(SessionEvent::FileSelected { generation: second });

        assert_eq!(session.handle(decoded(first)), Transition::Stale);
        assert_eq!(session.state(), SessionState::Loading { generation: second });
        assert!(session.image().is_none());

        session.handle(decoded(second));
        assert_eq!(session.state(), SessionState::Ready);

        // A late completion after the load settled is dropped as well.
        assert_eq!(session.handle(decoded(first)), Transition::Stale);
    }

    #[test]
    fn failed_decode_keeps_previous_image() {
        let mut session = Session::new();
        let generation = session.next_generation();
        session.handle(SessionEvent::FileSelected { generation });
        session.handle(decoded(generation));
        let previous = session.image().cloned();

        let generation = session.next_generation();
        session.handle(SessionEvent::FileSelected { generation });
        session.handle(SessionEvent::DecodeCompleted(DecodeCompletion {
            generation,
            result: Err(RenderError::EmptyImage),
        }));

        assert_eq!(session.state(), SessionState::Ready);
        assert_eq!(session.image().cloned(), previous);
        assert_eq!(session.message(), Some(PLACEHOLDER_MESSAGE));
    }

    #[test]
    fn failed_first_decode_returns_to_idle() {
        let mut session = Session::new();
        let generation = session.next_generation();
        session.handle(SessionEvent::FileSelected { generation });
        session.handle(SessionEvent::DecodeCompleted(DecodeCompletion {
            generation,
            result: Err(RenderError::EmptyImage),
        }));
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn decode_failures_only_apply_to_current_load() {
        let mut session = Session::new();
        let first = session.next_generation();
        session.handle(SessionEvent::FileSelected { generation: first });
        let second = session.next_generation();
        session.handle(SessionEvent::FileSelected { generation: second });

        assert_eq!(session.decode_failed(first, &RenderError::EmptyImage), Transition::Stale);
        assert_eq!(session.state(), SessionState::Loading { generation: second });

        let transition = session.decode_failed(second, &RenderError::EmptyImage);
        assert_eq!(
            transition,
            Transition::Moved {
                from: SessionState::Loading { generation: second },
                to: SessionState::Idle
            }
        );
    }

    #[test]
    fn render_requests_need_an_image() {
        let mut session = Session::new();
        assert_eq!(session.handle(SessionEvent::RenderRequested), Transition::Ignored);
        assert_eq!(session.state(), SessionState::Idle);
    }

    #[test]
    fn render_on_load_skips_ready() {
        let mut session = Session::new().render_on_load(true);
        let generation = session.next_generation();
        session.handle(SessionEvent::FileSelected { generation });
        let transition = session.handle(decoded(generation));
        assert_eq!(
            transition,
            Transition::Moved {
                from: SessionState::Loading { generation },
                to: SessionState::Rendering
            }
        );
    }

    #[test]
    fn context_renders_selected_bytes() {
        let mut png = Vec::new();
        let image = image::RgbaImage::from_pixel(8, 8, image::Rgba([0, 0, 0, 255]));
        image::DynamicImage::ImageRgba8(image)
            .write_to(&mut std::io::Cursor::new(&mut png), image::ImageOutputFormat::Png)
            .unwrap();

        let mut context = RenderContext::new(GlyphRenderer::text());
        context.load(ImageSource::Bytes(png)).unwrap();
        assert_eq!(context.session().state(), SessionState::Ready);

        let art = context.request_render().unwrap();
        // 8x8 fits to 800x800, sampled every fourth pixel.
        assert_eq!(art.grid().width, 200);
        assert_eq!(art.grid().height, 200);
    }

    #[test]
    fn context_reports_unknown_samples() {
        let mut context = RenderContext::new(GlyphRenderer::text());
        let err = context.load(ImageSource::Sample("missing".into())).unwrap_err();
        assert!(matches!(&err, RenderError::UnknownSample(name) if name == "missing"));
        assert!(err.is_decode());
        assert_eq!(context.session().message(), Some(PLACEHOLDER_MESSAGE));
        assert_eq!(context.session().state(), SessionState::Idle);
        assert!(context.request_render().is_none());
    }
}
