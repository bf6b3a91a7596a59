use chrono::{Datelike, Local, NaiveDate};
use crossterm::event::KeyCode;

#[derive(Clone, Copy, PartialEq)]
pub enum DatePart {
    Year,
    Month,
    Day,
}

/// Segmented Y/M/D editor. The value can be unset, which the date-range
/// filters read as an open bound.
pub struct DateInputState {
    value: Option<NaiveDate>,
    pub editing: bool,
    part: DatePart,
    buffer: String,
}

impl DateInputState {
    pub fn new(value: Option<NaiveDate>) -> Self {
        Self {
            value,
            editing: false,
            part: DatePart::Year,
            buffer: String::new(),
        }
    }

    pub fn value(&self) -> Option<NaiveDate> {
        self.value
    }

    pub fn toggle_editing(&mut self) {
        self.editing = !self.editing;
        if self.editing {
            self.part = DatePart::Year;
            self.buffer.clear();
            // Editing an unset date starts from today.
            if self.value.is_none() {
                self.value = Some(Local::now().date_naive());
            }
        }
    }

    pub fn next_part(&mut self) {
        self.part = match self.part {
            DatePart::Year => DatePart::Month,
            DatePart::Month => DatePart::Day,
            DatePart::Day => DatePart::Year,
        };
        self.buffer.clear();
    }

    pub fn previous_part(&mut self) {
        self.part = match self.part {
            DatePart::Year => DatePart::Day,
            DatePart::Month => DatePart::Year,
            DatePart::Day => DatePart::Month,
        };
        self.buffer.clear();
    }

    pub fn handle_input(&mut self, key: KeyCode) {
        if !self.editing {
            return;
        }

        match key {
            KeyCode::Char(c) if c.is_ascii_digit() => self.push_digit(c),
            KeyCode::Backspace => {
                self.buffer.pop();
            }
            // Delete clears the whole value; the filter becomes unbounded.
            KeyCode::Delete => {
                self.value = None;
                self.buffer.clear();
                self.editing = false;
            }
            KeyCode::Right => self.next_part(),
            KeyCode::Left => self.previous_part(),
            _ => {}
        }
    }

    fn push_digit(&mut self, c: char) {
        let Some(date) = self.value else { return };
        let (year, month, day) = (date.year(), date.month(), date.day());

        match self.part {
            DatePart::Year => {
                self.buffer.push(c);
                if self.buffer.len() == 4 {
                    if let Ok(new_year) = self.buffer.parse::<i32>() {
                        if (1900..=2100).contains(&new_year) {
                            if let Some(new_date) = NaiveDate::from_ymd_opt(new_year, month, day) {
                                self.value = Some(new_date);
                                // Accepted segments advance to the next part.
                                self.next_part();
                                return;
                            }
                        }
                    }
                    self.buffer.clear();
                }
            }
            DatePart::Month => {
                self.buffer.push(c);
                if self.buffer.len() == 2 {
                    if let Ok(new_month) = self.buffer.parse::<u32>() {
                        if (1..=12).contains(&new_month) {
                            if let Some(new_date) = NaiveDate::from_ymd_opt(year, new_month, day) {
                                self.value = Some(new_date);
                                self.next_part();
                                return;
                            }
                        }
                    }
                    self.buffer.clear();
                }
            }
            DatePart::Day => {
                self.buffer.push(c);
                if self.buffer.len() == 2 {
                    if let Ok(new_day) = self.buffer.parse::<u32>() {
                        if new_day >= 1 && new_day <= days_in_month(year, month) {
                            if let Some(new_date) = NaiveDate::from_ymd_opt(year, month, new_day) {
                                self.value = Some(new_date);
                            }
                        }
                    }
                    self.buffer.clear();
                }
            }
        }
    }

    pub fn display_string(&self) -> String {
        let Some(date) = self.value else {
            return "—".to_string();
        };

        let date_str = date.format("%Y-%m-%d").to_string();
        if !self.editing {
            return date_str;
        }

        let cursor = if !self.buffer.is_empty() {
            format!("[{}]", self.buffer)
        } else {
            match self.part {
                DatePart::Year => "[YYYY]".to_string(),
                DatePart::Month => "[MM]".to_string(),
                DatePart::Day => "[DD]".to_string(),
            }
        };

        let (year, month, day) = (
            date.format("%Y").to_string(),
            date.format("%m").to_string(),
            date.format("%d").to_string(),
        );
        match self.part {
            DatePart::Year => format!("{year}{cursor}-{month}-{day}"),
            DatePart::Month => format!("{year}-{month}{cursor}-{day}"),
            DatePart::Day => format!("{year}-{month}-{day}{cursor}"),
        }
    }
}

fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        2 => {
            if (year % 4 == 0 && year % 100 != 0) || (year % 400 == 0) {
                29
            } else {
                28
            }
        }
        _ => 30,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn typing_a_full_year_replaces_the_year() {
        let mut input = DateInputState::new(Some(date(2024, 6, 15)));
        input.toggle_editing();

        for c in "2025".chars() {
            input.handle_input(KeyCode::Char(c));
        }

        assert_eq!(input.value(), Some(date(2025, 6, 15)));
    }

    #[test]
    fn invalid_month_is_rejected() {
        let mut input = DateInputState::new(Some(date(2024, 6, 15)));
        input.toggle_editing();
        input.next_part();

        input.handle_input(KeyCode::Char('1'));
        input.handle_input(KeyCode::Char('3'));

        assert_eq!(input.value(), Some(date(2024, 6, 15)));
    }

    #[test]
    fn day_respects_month_length() {
        let mut input = DateInputState::new(Some(date(2023, 2, 10)));
        input.toggle_editing();
        input.next_part();
        input.next_part();

        // 29 is out of range for February 2023.
        input.handle_input(KeyCode::Char('2'));
        input.handle_input(KeyCode::Char('9'));
        assert_eq!(input.value(), Some(date(2023, 2, 10)));

        input.handle_input(KeyCode::Char('2'));
        input.handle_input(KeyCode::Char('8'));
        assert_eq!(input.value(), Some(date(2023, 2, 28)));
    }

    #[test]
    fn delete_clears_the_bound() {
        let mut input = DateInputState::new(Some(date(2024, 6, 15)));
        input.toggle_editing();
        input.handle_input(KeyCode::Delete);

        assert_eq!(input.value(), None);
        assert!(!input.editing);
        assert_eq!(input.display_string(), "—");
    }

    #[test]
    fn editing_an_unset_date_starts_from_today() {
        let mut input = DateInputState::new(None);
        input.toggle_editing();

        assert_eq!(input.value(), Some(Local::now().date_naive()));
    }
}
