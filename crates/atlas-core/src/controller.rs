//! Debounced recomputation at the boundary.
//!
//! Selection changes arrive as [`MapEvent`]s on a channel. A burst of events
//! arriving within the debounce window of its first event is folded into the
//! state and produces at most one frame. Rendering itself stays synchronous.

use crate::error::AtlasResult;
use crate::facts::Fact;
use crate::filter::Filter;
use crate::mapper::MapperRegistry;
use crate::provider::DataProvider;
use crate::state::{MapFrame, MapState};
use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

#[derive(Debug, Clone, PartialEq)]
pub enum MapEvent {
    Filter(Filter),
    ColorFact(Option<Fact>),
    LabelFact(Option<Fact>),
    Mapper(String),
    ShowFiltered(bool),
    /// Render even if nothing changed
    Refresh,
}

/// Unbounded event channel for a controller
pub fn event_channel() -> (Sender<MapEvent>, Receiver<MapEvent>) {
    channel::unbounded()
}

pub struct MapController {
    state: MapState,
    provider: Arc<DataProvider>,
    mappers: Arc<MapperRegistry>,
    events: Receiver<MapEvent>,
    debounce: Duration,
}

impl MapController {
    pub fn new(
        state: MapState,
        provider: Arc<DataProvider>,
        mappers: Arc<MapperRegistry>,
        events: Receiver<MapEvent>,
        debounce: Duration,
    ) -> Self {
        Self { state, provider, mappers, events, debounce }
    }

    pub fn state(&self) -> &MapState {
        &self.state
    }

    /// Fold `event` into the state. Returns true only for [`MapEvent::Refresh`].
    fn apply(&mut self, event: MapEvent) -> bool {
        match event {
            MapEvent::Filter(filter) => {
                self.state.set_filter(filter);
            }
            MapEvent::ColorFact(fact) => {
                self.state.set_color_fact(fact);
            }
            MapEvent::LabelFact(fact) => {
                self.state.set_label_fact(fact);
            }
            MapEvent::Mapper(id) => {
                self.state.set_mapper(id);
            }
            MapEvent::ShowFiltered(show) => {
                self.state.set_show_filtered(show);
            }
            MapEvent::Refresh => return true,
        }
        false
    }

    /// Render the current state immediately
    pub fn render_now(&self) -> AtlasResult<MapFrame> {
        self.state.render(&self.provider, &self.mappers)
    }

    /// Block until a burst of events changes the state, then render it.
    ///
    /// Bursts that end on the selection they started from are skipped, even
    /// if they changed it along the way. Returns `Ok(None)` once every sender
    /// is gone and no change is pending.
    pub fn next_frame(&mut self) -> AtlasResult<Option<MapFrame>> {
        loop {
            let Ok(first) = self.events.recv() else {
                return Ok(None);
            };
            let before = self.state.clone();
            let mut refresh = self.apply(first);
            let mut coalesced = 1usize;

            let deadline = Instant::now() + self.debounce;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                match self.events.recv_timeout(remaining) {
                    Ok(event) => {
                        refresh |= self.apply(event);
                        coalesced += 1;
                    }
                    Err(RecvTimeoutError::Timeout | RecvTimeoutError::Disconnected) => break,
                }
            }

            if refresh || !self.state.same_selection(&before) {
                debug!(coalesced, revision = self.state.revision(), "Rendering after burst");
                return self.render_now().map(Some);
            }
            debug!(coalesced, "Burst left state unchanged");
        }
    }

    /// Render one frame per effective burst until the channel closes
    pub fn run(&mut self, mut sink: impl FnMut(MapFrame)) -> AtlasResult<u64> {
        let mut frames = 0;
        while let Some(frame) = self.next_frame()? {
            sink(frame);
            frames += 1;
        }
        info!(frames, "Event channel closed");
        Ok(frames)
    }
}
