//! Section selector: which section a run covers, by UTC hour

use std::collections::BTreeMap;

use crate::model::Section;

/// 24-slot mapping from UTC hour to section
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SectionSchedule {
    slots: [Section; 24],
}

#[derive(Debug, thiserror::Error)]
pub enum ScheduleError {
    #[error("Hour {0} is outside 0..=23")]
    InvalidHour(u8),
}

impl Default for SectionSchedule {
    fn default() -> Self {
        let mut slots = [Section::New; 24];
        for (hour, slot) in slots.iter_mut().enumerate() {
            *slot = default_section(hour);
        }
        Self { slots }
    }
}

fn default_section(hour: usize) -> Section {
    match hour {
        0..=5 => Section::Trending,
        6..=9 => Section::New,
        10..=13 => Section::Upcoming,
        14..=17 => Section::New,
        18..=20 => Section::Movers,
        _ => Section::Upcoming,
    }
}

impl SectionSchedule {
    /// Default schedule with individual hours replaced
    pub fn with_overrides(overrides: &BTreeMap<u8, Section>) -> Result<Self, ScheduleError> {
        let mut schedule = Self::default();
        for (&hour, &section) in overrides {
            let slot = schedule
                .slots
                .get_mut(usize::from(hour))
                .ok_or(ScheduleError::InvalidHour(hour))?;
            *slot = section;
        }
        Ok(schedule)
    }

    /// Section for a UTC hour; hours past 23 wrap around
    pub fn section_for(&self, hour: u8) -> Section {
        self.slots[usize::from(hour % 24)]
    }

    /// Number of hourly slots assigned to a section
    pub fn slots_for(&self, section: Section) -> usize {
        self.slots.iter().filter(|s| **s == section).count()
    }
}
