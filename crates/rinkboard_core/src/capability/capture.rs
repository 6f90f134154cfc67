//! Stylus capture surface binding.

use crate::model::drawing::Drawing;
use crate::service::content_writer::ContentSink;
use log::warn;

/// Callback receiving the full serialized content after every edit.
pub type ContentChangedHandler = Box<dyn FnMut(Vec<u8>) + Send>;

/// Platform drawing canvas that produces serialized stylus content.
pub trait CaptureSurface {
    /// Preloads previously saved content. Empty content means a blank canvas.
    fn load_content(&mut self, content: &[u8]);
    /// Installs the change handler, replacing any previous one.
    fn on_content_changed(&mut self, handler: ContentChangedHandler);
}

/// Loads `drawing` into `surface` and routes its edits into `sink`.
///
/// The installed handler only enqueues; persistence happens on the content
/// writer thread.
pub fn bind_capture_surface<C: CaptureSurface + ?Sized>(
    surface: &mut C,
    drawing: &Drawing,
    sink: ContentSink,
) {
    surface.load_content(&drawing.canvas_data);
    let drawing_id = drawing.id;
    surface.on_content_changed(Box::new(move |content| {
        if let Err(err) = sink.submit(drawing_id, content) {
            warn!(
                "event=capture_content_changed module=capability status=error drawing_id={drawing_id} error={err}"
            );
        }
    }));
}
