//! Paged parameters with catch/pickup takeover.
//!
//! Two physical knobs serve many logical parameters, one pair per page.
//! When the page changes, the knobs are generally nowhere near the values
//! of the parameters they now control. A `ParameterPage` therefore ignores
//! its knob until the knob passes within `catch` of the last accepted
//! position, and only then starts tracking it. MIDI CC goes through the
//! same gate against the same remembered position, so the two input paths
//! never disagree about where the parameter "is".
//!
//! Positions are always raw linear knob positions in 0..1. The taper is
//! applied when mapping a position onto the parameter range.

use crate::controls::Page;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Taper {
    Linear,
    /// Squared position: fine control at the bottom of the range.
    Exponential,
}

impl Taper {
    pub fn apply(self, position: f64) -> f64 {
        match self {
            Taper::Linear => position,
            Taper::Exponential => position * position,
        }
    }

    pub fn invert(self, tapered: f64) -> f64 {
        match self {
            Taper::Linear => tapered,
            Taper::Exponential => tapered.max(0.0).sqrt(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct ParameterPage {
    current: f64,
    min: f64,
    max: f64,
    page: Option<Page>,
    /// Last accepted raw position.
    pot: f64,
    catch: f64,
    taper: Taper,
    stepped: bool,
    changed: bool,
}

impl ParameterPage {
    /// Linear, continuous parameter. `page` is `None` for parameters that
    /// have no knob slot (MIDI and buttons only).
    pub fn new(min: f64, max: f64, default: f64, page: Option<Page>, catch: f64) -> Self {
        let mut param = Self {
            current: default,
            min,
            max,
            page,
            pot: 0.0,
            catch,
            taper: Taper::Linear,
            stepped: false,
            changed: false,
        };
        param.pot = param.position_of(default);
        param
    }

    pub fn with_taper(mut self, taper: Taper) -> Self {
        self.taper = taper;
        self.pot = self.position_of(self.current);
        self
    }

    /// Round mapped values to whole numbers (selectors, strides).
    pub fn stepped(mut self) -> Self {
        self.stepped = true;
        self.current = self.current.round();
        self
    }

    fn value_at(&self, position: f64) -> f64 {
        let value = self.min + self.taper.apply(position) * (self.max - self.min);
        if self.stepped { value.round() } else { value }
    }

    fn position_of(&self, value: f64) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 {
            return 0.0;
        }
        self.taper.invert(((value - self.min) / span).clamp(0.0, 1.0))
    }

    fn try_catch(&mut self, position: f64) -> f64 {
        let position = position.clamp(0.0, 1.0);
        if (position - self.pot).abs() < self.catch {
            self.pot = position;
            let value = self.value_at(position);
            if value != self.current {
                self.current = value;
                self.changed = true;
            }
        }
        self.current
    }

    /// Offer a knob position. Ignored unless `active_page` is this
    /// parameter's page and the knob has caught up with it.
    pub fn process_physical(&mut self, position: f64, active_page: Page) -> f64 {
        if self.page != Some(active_page) {
            return self.current;
        }
        self.try_catch(position)
    }

    /// Offer a MIDI CC value (0..=127) through the same catch gate.
    pub fn process_midi_cc(&mut self, value: u8) -> f64 {
        self.try_catch(value.min(127) as f64 / 127.0)
    }

    /// Set the value directly (button presses, host automation) and move
    /// the remembered position with it.
    pub fn set_value(&mut self, value: f64) {
        let value = value.clamp(self.min.min(self.max), self.max.max(self.min));
        let value = if self.stepped { value.round() } else { value };
        self.pot = self.position_of(value);
        if value != self.current {
            self.current = value;
            self.changed = true;
        }
    }

    /// True once per accepted update; reading clears it.
    pub fn changed(&mut self) -> bool {
        std::mem::take(&mut self.changed)
    }

    pub fn value(&self) -> f64 {
        self.current
    }

    pub fn pot(&self) -> f64 {
        self.pot
    }

    pub fn page(&self) -> Option<Page> {
        self.page
    }

    pub fn range(&self) -> (f64, f64) {
        (self.min, self.max)
    }

    /// Current value as a 0..1 fraction of the range (linear, untapered).
    pub fn normalized(&self) -> f64 {
        let span = self.max - self.min;
        if span == 0.0 { 0.0 } else { (self.current - self.min) / span }
    }
}
