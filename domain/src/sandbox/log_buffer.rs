//! Bounded log capture for sandboxed code

use super::entities::SandboxLimits;

/// Collects log lines up to a fixed bound.
///
/// Lines past `max_log_lines` are counted, not stored; [`LogBuffer::into_lines`]
/// appends a single marker reporting how many were dropped.
#[derive(Debug, Clone)]
pub struct LogBuffer {
    lines: Vec<String>,
    dropped: usize,
    max_lines: usize,
    max_line_chars: usize,
}

impl LogBuffer {
    pub fn new(limits: &SandboxLimits) -> Self {
        Self {
            lines: Vec::new(),
            dropped: 0,
            max_lines: limits.max_log_lines,
            max_line_chars: limits.max_log_line_chars,
        }
    }

    pub fn push(&mut self, line: impl AsRef<str>) {
        if self.lines.len() >= self.max_lines {
            self.dropped += 1;
            return;
        }
        let line = line.as_ref();
        let line = if line.chars().count() > self.max_line_chars {
            let mut cut: String = line
                .chars()
                .take(self.max_line_chars.saturating_sub(3))
                .collect();
            cut.push_str("...");
            cut
        } else {
            line.to_string()
        };
        self.lines.push(line);
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn dropped(&self) -> usize {
        self.dropped
    }

    pub fn into_lines(mut self) -> Vec<String> {
        if self.dropped > 0 {
            self.lines.push(format!("... {} log lines dropped", self.dropped));
        }
        self.lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limits(lines: usize, chars: usize) -> SandboxLimits {
        SandboxLimits {
            max_log_lines: lines,
            max_log_line_chars: chars,
            ..SandboxLimits::default()
        }
    }

    #[test]
    fn test_keeps_lines_under_bound() {
        let mut buffer = LogBuffer::new(&limits(3, 100));
        buffer.push("a");
        buffer.push("b");
        assert_eq!(buffer.into_lines(), vec!["a", "b"]);
    }

    #[test]
    fn test_drops_excess_with_marker() {
        let mut buffer = LogBuffer::new(&limits(2, 100));
        for i in 0..5 {
            buffer.push(format!("line {}", i));
        }
        assert_eq!(buffer.dropped(), 3);
        assert_eq!(
            buffer.into_lines(),
            vec!["line 0", "line 1", "... 3 log lines dropped"]
        );
    }

    #[test]
    fn test_long_line_is_cut() {
        let mut buffer = LogBuffer::new(&limits(5, 10));
        buffer.push("x".repeat(50));
        let lines = buffer.into_lines();
        assert_eq!(lines[0], "xxxxxxx...");
        assert_eq!(lines[0].chars().count(), 10);
    }
}
