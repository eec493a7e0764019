use crate::{Result, SampledResult};

mod json;
mod text;

pub use json::JsonRenderer;
pub use text::{TextRenderer, DEFAULT_PRECISION};

/// Consumes one [`SampledResult`] per tick. Rendering happens on the
/// sampling task, so a slow renderer delays the next tick.
pub trait Renderer {
    fn render(&mut self, result: &SampledResult) -> Result<()>;

    fn flush(&mut self) -> Result<()>;
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&mut self, result: &SampledResult) -> Result<()> {
        (**self).render(result)
    }

    fn flush(&mut self) -> Result<()> {
        (**self).flush()
    }
}
