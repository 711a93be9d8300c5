use super::*;
use std::sync::{
    atomic::{AtomicUsize, Ordering},
    Arc,
};

struct CountingPreview {
    releases: Arc<AtomicUsize>,
    frame: StillFrame,
}

impl DeviceHandle for CountingPreview {
    fn kind(&self) -> DeviceKind {
        DeviceKind::Camera
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl CameraPreview for CountingPreview {
    async fn grab_still(&mut self) -> Result<StillFrame, DeviceError> {
        Ok(self.frame.clone())
    }
}

struct CountingCamera {
    releases: Arc<AtomicUsize>,
}

#[async_trait]
impl CameraSource for CountingCamera {
    async fn open_preview(&self) -> Result<Box<dyn CameraPreview>, DeviceError> {
        Ok(Box::new(CountingPreview {
            releases: self.releases.clone(),
            frame: StillFrame::new(vec![0xFF, 0xD8, 0xFF], "image/jpeg")?,
        }))
    }
}

#[tokio::test]
async fn lease_releases_handle_once_on_explicit_release() {
    let releases = Arc::new(AtomicUsize::new(0));
    let camera = CountingCamera {
        releases: releases.clone(),
    };

    let mut lease = acquire_camera(&camera).await.expect("acquire");
    let frame = lease.handle_mut().grab_still().await.expect("frame");
    assert_eq!(frame.bytes(), &[0xFF, 0xD8, 0xFF]);
    assert_eq!(releases.load(Ordering::SeqCst), 0);

    lease.release();
    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn lease_releases_handle_on_drop() {
    let releases = Arc::new(AtomicUsize::new(0));
    let camera = CountingCamera {
        releases: releases.clone(),
    };

    {
        let lease = acquire_camera(&camera).await.expect("acquire");
        assert_eq!(lease.kind(), DeviceKind::Camera);
    }

    assert_eq!(releases.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn missing_devices_report_unavailable() {
    let camera = acquire_camera(&MissingCamera).await;
    assert!(matches!(
        camera,
        Err(DeviceError::Unavailable(DeviceKind::Camera))
    ));

    let microphone = acquire_microphone(&MissingMicrophone).await;
    match microphone {
        Err(err) => assert_eq!(err.kind(), DeviceKind::Microphone),
        Ok(_) => panic!("missing microphone must not produce a lease"),
    }
}

#[test]
fn parses_browser_screenshot_data_url() {
    let frame = StillFrame::from_data_url("data:image/png;base64,iVBORw0KGgo=").expect("frame");
    assert_eq!(frame.mime_type(), "image/png");
    assert_eq!(frame.extension(), "png");
    assert_eq!(frame.bytes(), &[0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1A, b'\n']);
}

#[test]
fn rejects_malformed_data_urls() {
    assert!(StillFrame::from_data_url("image/png;base64,AAAA").is_err());
    assert!(StillFrame::from_data_url("data:image/png,AAAA").is_err());
    assert!(StillFrame::from_data_url("data:text/plain;base64,AAAA").is_err());
    assert!(StillFrame::from_data_url("data:image/jpeg;base64,").is_err());
}

#[test]
fn pcm_recording_materialises_decodable_wav() {
    let pcm = PcmRecording {
        sample_rate: 16_000,
        channels: 1,
        samples: vec![0, 1200, -1200, 300, -300, 0],
    };

    let clip = RecorderOutput::Pcm(pcm).into_clip().expect("clip");
    assert_eq!(clip.mime_type(), "audio/wav");
    assert_eq!(clip.extension(), "wav");
    assert_eq!(&clip.bytes()[..4], b"RIFF");

    let reader = hound::WavReader::new(std::io::Cursor::new(clip.bytes())).expect("decode");
    assert_eq!(reader.spec().sample_rate, 16_000);
    assert_eq!(reader.len(), 6);
}

#[test]
fn empty_recordings_are_rejected() {
    let pcm = PcmRecording {
        sample_rate: 44_100,
        channels: 2,
        samples: Vec::new(),
    };
    assert!(matches!(
        RecorderOutput::Pcm(pcm).into_clip(),
        Err(DeviceError::InvalidAudio(_))
    ));

    let encoded = RecorderOutput::Encoded {
        bytes: Vec::new(),
        mime_type: "audio/mp4".into(),
    };
    assert!(encoded.into_clip().is_err());
}

#[test]
fn wav_labelled_output_must_decode() {
    // A player URL wrapped as bytes is not audio.
    let bogus = RecorderOutput::Encoded {
        bytes: b"blob:http://localhost:3000/6f1c".to_vec(),
        mime_type: "audio/wav".into(),
    };
    assert!(matches!(bogus.into_clip(), Err(DeviceError::InvalidAudio(_))));

    let mp4 = RecorderOutput::Encoded {
        bytes: vec![0, 0, 0, 0x18, b'f', b't', b'y', b'p'],
        mime_type: "audio/mp4".into(),
    };
    assert_eq!(mp4.into_clip().expect("mp4 passes through").extension(), "mp4");
}
