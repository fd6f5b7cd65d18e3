//! Compile-time catalog of the glow plug output channels.
//!
//! Channel order is the order the firmware binds its PWM outputs and sense
//! inputs in; the labels match the connector silkscreen and are used when
//! narrating a run.

/// Number of glow plug channels on the production board.
pub const CHANNEL_COUNT: usize = 6;

/// Identity of one glow plug output.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ChannelLine {
    pub index: usize,
    pub name: &'static str,
}

impl ChannelLine {
    pub const fn new(index: usize, name: &'static str) -> Self {
        Self { index, name }
    }
}

pub const GLOW_CHANNELS: [ChannelLine; CHANNEL_COUNT] = [
    ChannelLine::new(0, "GP1"),
    ChannelLine::new(1, "GP2"),
    ChannelLine::new(2, "GP3"),
    ChannelLine::new(3, "GP4"),
    ChannelLine::new(4, "GP5"),
    ChannelLine::new(5, "GP6"),
];

/// Looks up a channel's catalog entry.
#[must_use]
pub fn channel_line(index: usize) -> Option<&'static ChannelLine> {
    GLOW_CHANNELS.get(index)
}

/// Human-readable label for a channel, falling back to `"GP?"`.
#[must_use]
pub fn channel_label(index: usize) -> &'static str {
    channel_line(index).map_or("GP?", |line| line.name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_indices_match_positions() {
        for (position, line) in GLOW_CHANNELS.iter().enumerate() {
            assert_eq!(line.index, position);
            assert_eq!(channel_line(position), Some(line));
        }
        assert_eq!(channel_line(CHANNEL_COUNT), None);
    }

    #[test]
    fn labels_are_one_based() {
        assert_eq!(channel_label(0), "GP1");
        assert_eq!(channel_label(5), "GP6");
        assert_eq!(channel_label(6), "GP?");
    }
}
