use crate::capture::handle::MediaStreamHandle;
use crate::models::error::CaptureError;
use crate::models::media::{CaptureRequest, StreamKind};
use crate::traits::capture_provider::CaptureProvider;
use crate::traits::source_selector::{SelectionPurpose, SourceChoice, SourceSelector};

/// Enumerate sources fresh and ask the user to pick one.
///
/// A selected id that is not in the enumerated list is reported as
/// `DeviceUnavailable`; cancelling returns `SourceChoice::Cancelled`.
pub fn choose_source<P>(
    provider: &P,
    selector: &dyn SourceSelector,
    purpose: SelectionPurpose,
) -> Result<SourceChoice, CaptureError>
where
    P: CaptureProvider + ?Sized,
{
    let sources = provider.enumerate_sources()?;
    if sources.is_empty() {
        return Err(CaptureError::DeviceUnavailable("no capture sources available".into()));
    }
    log::debug!("Offering {} capture sources for {:?}", sources.len(), purpose);

    match selector.choose(&sources, purpose) {
        SourceChoice::Cancelled => {
            log::info!("Source selection cancelled ({:?})", purpose);
            Ok(SourceChoice::Cancelled)
        }
        SourceChoice::Selected(id) => {
            if sources.iter().any(|s| s.id == id) {
                Ok(SourceChoice::Selected(id))
            } else {
                Err(CaptureError::DeviceUnavailable(format!("source {} is no longer offered", id)))
            }
        }
    }
}

/// Acquire one stream and check it carries what the request implies.
///
/// Screen and camera streams must have video, microphone streams audio.
/// A stream that fails the check is released before the error is returned.
pub fn acquire_stream<P>(provider: &mut P, request: &CaptureRequest) -> Result<MediaStreamHandle, CaptureError>
where
    P: CaptureProvider + ?Sized,
{
    let kind = request.kind();
    let stream = provider.acquire(request).map_err(|e| {
        log::warn!("Acquiring {:?} failed: {}", kind, e);
        e
    })?;
    let mut handle = MediaStreamHandle::new(kind, stream);

    let usable = match kind {
        StreamKind::Screen | StreamKind::Camera => handle.has_video(),
        StreamKind::Microphone => handle.has_audio(),
    };
    if !usable {
        handle.release();
        return Err(CaptureError::DeviceUnavailable(format!(
            "{:?} stream {} has no usable track",
            kind,
            handle.id()
        )));
    }

    log::info!("Acquired {:?} stream {}", kind, handle.id());
    Ok(handle)
}
