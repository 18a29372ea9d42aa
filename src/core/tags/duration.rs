//! core/tags/duration.rs
//! Best-effort track length (Symphonia probe) for the read-only `duration` field.

use std::fs::File;
use std::path::Path;

use symphonia::core::formats::FormatOptions;
use symphonia::core::io::{MediaSourceStream, MediaSourceStreamOptions};
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::core::units::TimeBase;

/// Length in seconds, rounded to milliseconds. `None` if the stream can't tell.
pub(crate) fn probe_secs(path: &Path) -> Option<f64> {
    let file = File::open(path).ok()?;
    let mss = MediaSourceStream::new(Box::new(file), MediaSourceStreamOptions::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = match symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    ) {
        Ok(p) => p,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "duration probe failed");
            return None;
        }
    };

    let track = probed.format.default_track()?;
    secs_from_params(track.codec_params.time_base, track.codec_params.n_frames)
}

fn secs_from_params(time_base: Option<TimeBase>, n_frames: Option<u64>) -> Option<f64> {
    let tb = time_base?;
    let frames = n_frames?;

    let t = tb.calc_time(frames);
    // Time is { seconds: u64, frac: f64 } in symphonia 0.5.x.
    let ms = (t.seconds as f64 * 1000.0) + (t.frac * 1000.0);
    Some(ms.round() / 1000.0)
}
