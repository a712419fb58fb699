//! WAV audio output.

use crate::error::{Result, SynthesisError};
use hound::{SampleFormat, WavSpec, WavWriter};
use std::io::{BufWriter, Seek, Write};
use std::path::Path;
use tempfile::Builder;
use tracing::debug;

fn spec(sample_rate: u32) -> WavSpec {
    WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: SampleFormat::Int,
    }
}

/// Write 16-bit mono PCM WAV to `writer`.
///
/// Samples are clamped to [-1.0, 1.0] and scaled by `i16::MAX`, so -1.0 maps to
/// -32767. The RIFF and data sizes are patched in once all samples are written.
pub fn write_wav<W: Write + Seek>(
    writer: W,
    samples: &[f32],
    sample_rate: u32,
) -> hound::Result<()> {
    let mut writer = WavWriter::new(writer, spec(sample_rate))?;
    for &sample in samples {
        let clamped = sample.clamp(-1.0, 1.0);
        writer.write_sample((clamped * i16::MAX as f32) as i16)?;
    }
    writer.finalize()
}

/// Temp file builder whose files get the same mode as a plain `File::create`
/// (0o666 minus the umask) instead of tempfile's private 0o600.
fn output_builder() -> Builder<'static, 'static> {
    #[allow(unused_mut)]
    let mut builder = Builder::new();
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        builder.permissions(std::fs::Permissions::from_mode(0o666));
    }
    builder
}

/// Save audio samples to a WAV file.
///
/// The file is written next to `path` under a temporary name and renamed into
/// place on success; on failure nothing is left at `path`.
pub fn save_wav(samples: &[f32], path: &Path, sample_rate: u32) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut temp = output_builder()
        .tempfile_in(dir)
        .map_err(|err| SynthesisError::io(path, err))?;

    {
        let mut out = BufWriter::new(temp.as_file_mut());
        write_wav(&mut out, samples, sample_rate).map_err(|err| SynthesisError::io(path, err))?;
        out.flush().map_err(|err| SynthesisError::io(path, err))?;
    }

    temp.persist(path)
        .map_err(|err| SynthesisError::io(path, err.error))?;
    debug!(path = %path.display(), samples = samples.len(), "wrote wav");
    Ok(())
}
