//! Pull contract shared by every audio node

/// One node of an audio path.
///
/// Streams are created on the logic thread and then owned by the audio
/// context, which calls [`get_samples`](Stream::get_samples) from the
/// output callback. Implementations never block and never panic; errors
/// degrade to silence.
pub trait Stream: Send {
    fn channels(&self) -> u16;

    fn sample_rate(&self) -> u32;

    /// Replaces `out` with exactly `frames * channels` interleaved samples.
    ///
    /// Samples past the end of finite data are zero. Once the end is
    /// reached the stream reports [`is_finished`](Stream::is_finished).
    fn get_samples(&mut self, frames: usize, out: &mut Vec<f32>);

    /// Rewinds to the first frame and clears the finished flag.
    fn reset(&mut self);

    fn is_finished(&self) -> bool;
}

/// Immutable sound description that can spawn any number of streams.
pub trait SoundData: Send + Sync {
    fn channels(&self) -> u16;

    fn sample_rate(&self) -> u32;

    fn create_stream(&self) -> Box<dyn Stream>;
}

/// Resizes `out` to `len` zeroed samples, keeping its allocation.
pub(crate) fn zeroed(out: &mut Vec<f32>, len: usize) {
    out.clear();
    out.resize(len, 0.0);
}
