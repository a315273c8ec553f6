use crate::error::FrameError;

/// Every task goes over the wire padded to exactly this many bytes.
pub const TASK_WIDTH: usize = 70;

/// Every response is exactly this many bytes: `<taskID>:<queueTimeMS>` plus padding.
pub const FRAME_LEN: usize = 16;

/// One response frame: which task finished and how long it sat in the
/// server's queue.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Correlation {
    pub task_id: u64,
    pub queue_time_ms: f64,
}

impl Correlation {
    pub fn parse(frame: &[u8; FRAME_LEN]) -> Result<Self, FrameError> {
        let text = std::str::from_utf8(frame).map_err(|_| FrameError::NotUtf8)?;
        let text = text.trim_matches(|c: char| c.is_ascii_whitespace() || c == '\0');

        let (task_id, queue_time_ms) = text.split_once(':').ok_or(FrameError::MissingSeparator)?;
        let task_id = task_id.trim();
        let queue_time_ms = queue_time_ms.trim();

        Ok(Self {
            task_id: task_id
                .parse()
                .map_err(|_| FrameError::BadTaskId(task_id.to_string()))?,
            queue_time_ms: queue_time_ms
                .parse()
                .map_err(|_| FrameError::BadQueueTime(queue_time_ms.to_string()))?,
        })
    }

    /// Space-padded frame, queue time with one decimal.
    pub fn encode(&self) -> Result<[u8; FRAME_LEN], FrameError> {
        let text = format!("{}:{:.1}", self.task_id, self.queue_time_ms);
        if text.len() > FRAME_LEN {
            return Err(FrameError::TooLong(text.len()));
        }

        let mut frame = [b' '; FRAME_LEN];
        frame[..text.len()].copy_from_slice(text.as_bytes());
        Ok(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(text: &str, pad: u8) -> [u8; FRAME_LEN] {
        let mut frame = [pad; FRAME_LEN];
        frame[..text.len()].copy_from_slice(text.as_bytes());
        frame
    }

    #[test]
    fn parses_space_padded_frame() {
        let parsed = Correlation::parse(&frame("12:3.5", b' ')).unwrap();
        assert_eq!(parsed.task_id, 12);
        assert_eq!(parsed.queue_time_ms, 3.5);
    }

    #[test]
    fn parses_nul_padded_and_unpadded_frames() {
        let parsed = Correlation::parse(&frame("7:0.0", b'\0')).unwrap();
        assert_eq!(parsed.task_id, 7);
        assert_eq!(parsed.queue_time_ms, 0.0);

        let parsed = Correlation::parse(b"123456:1234.5678").unwrap();
        assert_eq!(parsed.task_id, 123456);
        assert_eq!(parsed.queue_time_ms, 1234.5678);
    }

    #[test]
    fn rejects_malformed_frames() {
        assert_eq!(
            Correlation::parse(&frame("12 3.5", b' ')),
            Err(FrameError::MissingSeparator)
        );
        assert_eq!(
            Correlation::parse(&frame("x:3.5", b' ')),
            Err(FrameError::BadTaskId("x".to_string()))
        );
        assert_eq!(
            Correlation::parse(&frame("-1:3.5", b' ')),
            Err(FrameError::BadTaskId("-1".to_string()))
        );
        assert_eq!(
            Correlation::parse(&frame("4:", b' ')),
            Err(FrameError::BadQueueTime(String::new()))
        );

        let mut invalid = frame("1:1.0", b' ');
        invalid[10] = 0xff;
        assert_eq!(Correlation::parse(&invalid), Err(FrameError::NotUtf8));
    }

    #[test]
    fn encode_pads_with_spaces() {
        let encoded = Correlation {
            task_id: 42,
            queue_time_ms: 0.0,
        }
        .encode()
        .unwrap();
        assert_eq!(&encoded, b"42:0.0          ");

        let parsed = Correlation::parse(&encoded).unwrap();
        assert_eq!(parsed.task_id, 42);
    }

    #[test]
    fn encode_rejects_oversized_frames() {
        let result = Correlation {
            task_id: u64::MAX,
            queue_time_ms: 1.0,
        }
        .encode();
        assert!(matches!(result, Err(FrameError::TooLong(_))));
    }
}
