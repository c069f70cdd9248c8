#![allow(dead_code)]

use std::cell::Cell;

use adventure_state::{Calendar, Clock, EngineVar, GameState, TimeDate};

/// Clock that only moves when told to.
pub struct ManualClock {
    now: Cell<u32>,
}

impl ManualClock {
    pub fn at(millis: u32) -> Self {
        Self {
            now: Cell::new(millis),
        }
    }

    pub fn advance(&self, millis: u32) {
        self.now.set(self.now.get().wrapping_add(millis));
    }
}

impl Clock for ManualClock {
    fn millis(&self) -> u32 {
        self.now.get()
    }
}

pub struct FixedCalendar(pub TimeDate);

impl Calendar for FixedCalendar {
    fn now(&self) -> TimeDate {
        self.0
    }
}

pub fn calendar() -> FixedCalendar {
    FixedCalendar(TimeDate {
        year: 2004,
        month: 5,
        day: 11,
        hour: 18,
        minute: 45,
    })
}

/// A game some way into Amateria.
pub fn midgame_state() -> GameState {
    let mut state = GameState::new();
    state
        .set_var(EngineVar::LocationAge.index(), 7)
        .expect("set age");
    state
        .set_var(EngineVar::LocationRoom.index(), 801)
        .expect("set room");
    state
        .set_var(EngineVar::LocationNode.index(), 12)
        .expect("set node");
    state.set_var(1200, -77).expect("set script var");
    state.update_inventory(&[101, 102, 104]);
    state.set_zip_destination(31, true);
    state.limit_cube_camera(-45.0, 45.0, 0.0, 180.0);
    state.look_at(12.25, 97.5);
    state
        .set_save_description("Amateria, before the rings")
        .expect("description");
    state
}
