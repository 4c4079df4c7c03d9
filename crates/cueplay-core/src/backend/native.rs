//! Native element playback

use super::{LoadPlan, StartTrigger};
use crate::media::MediaElement;
use crate::types::Clip;
use tracing::debug;

/// The element plays sources directly; nothing to set up
pub(crate) struct NativeBackend {
    loads: u64,
}

impl NativeBackend {
    pub(crate) fn attach() -> Self {
        debug!("Native backend attached");
        Self { loads: 0 }
    }

    /// Point the element at the clip and start it. The start offset waits
    /// for `loadedmetadata`.
    pub(crate) fn load_and_play(&mut self, element: &mut dyn MediaElement, clip: &Clip) -> LoadPlan {
        self.loads += 1;
        debug!(source = %clip.source, load = self.loads, "Native load");

        element.set_source(&clip.source);
        element.play();

        LoadPlan {
            trigger: StartTrigger::MetadataLoaded,
            play_on_trigger: false,
        }
    }

    pub(crate) fn teardown(self) {
        debug!(loads = self.loads, "Native backend torn down");
    }
}
