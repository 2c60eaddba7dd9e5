//! Pipeline driver
//!
//! An ordered list of effects and an explicit frame state machine with
//! three caller-visible transitions: `begin_frame`, `run`, `end_frame`.
//! Any embedding can drive these; there is no inherited lifecycle.

use crate::command::{CommandList, MaterialId};
use crate::core::error::Error;
use crate::frame::FrameContext;
use crate::material::{MaterialProvider, WarnOnce};
use crate::target::backing::TargetBacking;
use crate::target::pool::ScratchPool;

/// Buffers an effect samples beyond the source color
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InputRequirements {
    pub depth: bool,
    pub normals: bool,
}

/// Recording context handed to each effect
pub struct RecordCtx<'a> {
    pub pool: &'a mut ScratchPool,
    pub backing: &'a mut dyn TargetBacking,
    pub materials: &'a dyn MaterialProvider,
    pub warn_once: &'a mut WarnOnce,
    pub cmds: &'a mut CommandList,
}

impl RecordCtx<'_> {
    /// Resolve a material by name, logging once per session when absent
    ///
    /// Returns `None` when unresolved; the caller skips its GPU work for
    /// the frame and retries resolution next frame.
    pub fn material(&mut self, name: &str) -> Option<MaterialId> {
        match self.materials.resolve(name) {
            Some(id) => Some(id),
            None => {
                self.warn_once.warn(
                    name,
                    &format!(
                        "missing material '{}'; pass will not execute, check renderer references",
                        name
                    ),
                );
                None
            }
        }
    }
}

/// One registered post-processing effect
pub trait Effect {
    fn name(&self) -> &str;

    /// Cheap once-per-frame activity check; inactive effects record
    /// nothing and touch no GPU memory
    fn is_active(&self, frame: &FrameContext) -> bool {
        let _ = frame;
        true
    }

    /// Auxiliary buffers this effect samples; the driver skips effects
    /// whose declared inputs the frame does not carry
    fn requirements(&self) -> InputRequirements {
        InputRequirements::default()
    }

    /// Record this effect's stages for the frame
    fn record(&mut self, frame: &FrameContext, ctx: &mut RecordCtx<'_>) -> Result<(), Error>;
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum FrameState {
    Idle,
    /// begin_frame accepted the frame
    Open,
    /// begin_frame decided to skip the frame entirely
    Skipped,
}

/// Ordered post-processing pipeline and its frame lifecycle
pub struct PostPipeline {
    effects: Vec<Box<dyn Effect>>,
    pool: ScratchPool,
    warn_once: WarnOnce,
    state: FrameState,
}

impl Default for PostPipeline {
    fn default() -> Self {
        Self::new()
    }
}

impl PostPipeline {
    pub fn new() -> Self {
        Self {
            effects: Vec::new(),
            pool: ScratchPool::new(),
            warn_once: WarnOnce::new(),
            state: FrameState::Idle,
        }
    }

    /// Append an effect; effects run in registration order
    pub fn add_effect(&mut self, effect: impl Effect + 'static) -> &mut Self {
        self.effects.push(Box::new(effect));
        self
    }

    pub fn effect_count(&self) -> usize {
        self.effects.len()
    }

    /// Begin a frame
    ///
    /// Excluded camera kinds and degenerate viewports are detected here,
    /// before any allocation; the returned error only means the frame is
    /// skipped, and `run`/`end_frame` stay safe to call regardless.
    pub fn begin_frame(&mut self, frame: &FrameContext) -> Result<(), Error> {
        debug_assert_eq!(self.state, FrameState::Idle, "unbalanced begin_frame");

        if !frame.camera.receives_post_processing() {
            self.state = FrameState::Skipped;
            return Err(Error::UnsupportedCamera(frame.camera));
        }
        let extent = frame.viewport.effective();
        if extent.is_empty() {
            self.state = FrameState::Skipped;
            return Err(Error::InvalidViewport {
                width: extent.width,
                height: extent.height,
            });
        }

        self.pool.begin_frame();
        self.state = FrameState::Open;
        Ok(())
    }

    /// Record every active effect, returning the frame's command list
    ///
    /// Effects whose declared input requirements the frame cannot satisfy
    /// are skipped with a once-per-session warning, before any allocation.
    /// An effect that fails mid-record has its partial stages dropped and
    /// its scratch handles released; the frame continues with the
    /// remaining effects.
    pub fn run(
        &mut self,
        frame: &FrameContext,
        backing: &mut dyn TargetBacking,
        materials: &dyn MaterialProvider,
    ) -> CommandList {
        let mut cmds = CommandList::new();
        if self.state != FrameState::Open {
            return cmds;
        }

        for effect in &mut self.effects {
            if !effect.is_active(frame) {
                continue;
            }
            let needs = effect.requirements();
            let missing = if needs.depth && !frame.inputs.depth {
                Some("depth")
            } else if needs.normals && !frame.inputs.normals {
                Some("normals")
            } else {
                None
            };
            if let Some(buffer) = missing {
                self.warn_once.warn(
                    &format!("{}:{}", effect.name(), buffer),
                    &format!(
                        "{} requires a {} buffer the host does not provide; skipped",
                        effect.name(),
                        buffer
                    ),
                );
                continue;
            }

            let mut staged = CommandList::new();
            let mut ctx = RecordCtx {
                pool: &mut self.pool,
                backing,
                materials,
                warn_once: &mut self.warn_once,
                cmds: &mut staged,
            };
            match effect.record(frame, &mut ctx) {
                Ok(()) => cmds.append(&mut staged),
                Err(err) => {
                    log::warn!("{}: {}; skipped this frame", effect.name(), err);
                    // drop the partial stages; release anything the
                    // failing effect still holds
                    self.pool.reclaim();
                }
            }
        }
        cmds
    }

    /// End the frame, releasing per-frame ownership of scratch targets
    pub fn end_frame(&mut self) {
        if self.state == FrameState::Open {
            self.pool.end_frame();
        }
        self.state = FrameState::Idle;
    }

    /// Feature-disable lifecycle: free all cached targets; nothing is
    /// allocated again until the pipeline is driven again
    pub fn disable(&mut self, backing: &mut dyn TargetBacking) {
        self.pool.retire_all(backing);
        self.state = FrameState::Idle;
    }

    pub fn pool(&self) -> &ScratchPool {
        &self.pool
    }

    pub fn warnings(&self) -> usize {
        self.warn_once.reported()
    }
}
