// ── Controller control events ──
//
// Everything that is not a transport event reaches the run loop through
// this enum: caller requests and timer expiries alike.

use crate::error::Notice;
use crate::model::Location;
use crate::timer::{TimerId, TimerKind};

#[derive(Debug)]
pub(crate) enum ControlEvent {
    /// The caller selected a new location.
    LocationChanged(Location),
    /// Location resolution finished (possibly with a fallback notice).
    LocationResolved {
        location: Location,
        notice: Option<Notice>,
    },
    /// A scheduled timer elapsed. Discarded unless `id` is still current.
    TimerFired { kind: TimerKind, id: TimerId },
}
