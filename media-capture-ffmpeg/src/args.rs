use std::path::Path;

use media_capture_core::{OutputFormat, QualityPreset, Scale, TranscodeJob, TranscodeTask};

/// Codec settings for merged output, matching the recorder's WebM defaults.
const MERGE_VIDEO_CODEC: &str = "libvpx";
const MERGE_VIDEO_BITRATE: &str = "2500k";
const MERGE_AUDIO_CODEC: &str = "libopus";
const MERGE_AUDIO_BITRATE: &str = "128k";

/// Full ffmpeg argument list for `job`, output path last.
pub fn build_args(job: &TranscodeJob) -> Vec<String> {
    let mut args: Vec<String> = ["-y", "-hide_banner", "-nostdin"].map(String::from).to_vec();
    push_input(&mut args, &job.input);

    match &job.task {
        TranscodeTask::Convert { format, quality } => convert_args(&mut args, *format, *quality),
        TranscodeTask::ExtractAudio => {
            args.extend(["-vn", "-acodec", "pcm_s16le"].map(String::from));
        }
        TranscodeTask::MergeAudio {
            audio_input,
            video_gain,
            audio_gain,
        } => {
            push_input(&mut args, audio_input);
            // amix divides by the input count unless told not to; gains are applied as given
            args.push("-filter_complex".into());
            args.push(format!(
                "[0:a]volume={}[va];[1:a]volume={}[aa];[va][aa]amix=inputs=2:duration=first:normalize=0[aout]",
                video_gain, audio_gain
            ));
            args.extend(
                [
                    "-map",
                    "0:v",
                    "-map",
                    "[aout]",
                    "-c:v",
                    MERGE_VIDEO_CODEC,
                    "-b:v",
                    MERGE_VIDEO_BITRATE,
                    "-c:a",
                    MERGE_AUDIO_CODEC,
                    "-b:a",
                    MERGE_AUDIO_BITRATE,
                ]
                .map(String::from),
            );
        }
    }

    args.push(job.output.to_string_lossy().into_owned());
    args
}

fn push_input(args: &mut Vec<String>, input: &Path) {
    args.push("-i".into());
    args.push(input.to_string_lossy().into_owned());
}

fn convert_args(args: &mut Vec<String>, format: OutputFormat, quality: QualityPreset) {
    let settings = quality.settings();

    if let Scale::Height(height) = settings.scale {
        // -2 keeps the width even, which most encoders require
        args.push("-vf".into());
        args.push(format!("scale=-2:{}", height));
    }

    args.push("-c:v".into());
    args.push(format.video_codec().into());
    if format != OutputFormat::Gif {
        args.push("-b:v".into());
        args.push(settings.video_bitrate());
    }

    match format.audio_codec() {
        Some(codec) => {
            args.push("-c:a".into());
            args.push(codec.into());
            args.push("-b:a".into());
            args.push(settings.audio_bitrate());
        }
        None => args.push("-an".into()),
    }
}
