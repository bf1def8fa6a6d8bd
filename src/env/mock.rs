//! Deterministic in-process scene for tests and offline runs.
//!
//! [`MockSimulator`] models a single room in which the agent stands still and
//! can only turn. Each object is visible from a fixed set of the four
//! compass headings, so rotating changes what the judge sees. Object
//! interactions follow simple physical rules (one held object, containers
//! open or closed) and report native success the way the real simulator does.

use std::collections::HashSet;

use anyhow::Result;

use super::traits::{Action, ActionKind, Frame, ObjectState, Observation, Simulator};

/// Number of distinct agent headings.
const HEADINGS: u8 = 4;

/// An object placed in a mock scene.
#[derive(Debug, Clone)]
pub struct MockObject {
    pub object_type: String,
    pub object_id: String,
    /// Headings (0..4) from which the object is visible.
    pub visible_from: Vec<u8>,
}

impl MockObject {
    pub fn new(object_type: &str, object_id: &str, visible_from: &[u8]) -> Self {
        Self {
            object_type: object_type.into(),
            object_id: object_id.into(),
            visible_from: visible_from.to_vec(),
        }
    }

    /// An object visible from every heading.
    pub fn everywhere(object_type: &str, object_id: &str) -> Self {
        Self::new(object_type, object_id, &[0, 1, 2, 3])
    }
}

/// A named scene template.
#[derive(Debug, Clone)]
pub struct MockScene {
    pub name: String,
    pub objects: Vec<MockObject>,
}

impl MockScene {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.into(),
            objects: Vec::new(),
        }
    }

    pub fn with_object(mut self, object: MockObject) -> Self {
        self.objects.push(object);
        self
    }

    /// A small kitchen: the tomato and the microwave are both in view only
    /// after one right turn.
    pub fn kitchen(name: &str) -> Self {
        Self::new(name)
            .with_object(MockObject::new("Tomato", "Tomato|-1.2|0.9|0.4", &[0, 1]))
            .with_object(MockObject::new("Apple", "Apple|-1.0|0.9|0.2", &[0]))
            .with_object(MockObject::new("Microwave", "Microwave|-0.3|1.1|1.6", &[1, 2]))
            .with_object(MockObject::new("Fridge", "Fridge|1.9|0.0|0.7", &[3]))
    }
}

/// A scripted simulator backed by [`MockScene`]s.
#[derive(Debug, Clone)]
pub struct MockSimulator {
    templates: Vec<MockScene>,
    scene: Option<MockScene>,
    heading: u8,
    held: Option<String>,
    open: HashSet<String>,
    started: bool,
    fail_start: bool,
    fail_reset: bool,
    stale_lookup: bool,
    failing: HashSet<ActionKind>,
    issued: Vec<Action>,
    resets: Vec<(String, bool)>,
    last_observation: Option<Observation>,
    frame: Option<Frame>,
}

impl MockSimulator {
    /// A mock whose every scene name resolves to [`MockScene::kitchen`].
    pub fn new() -> Self {
        Self::with_scenes(Vec::new())
    }

    /// A mock with explicit scene templates. Unknown scene names fall back to
    /// the kitchen layout.
    pub fn with_scenes(templates: Vec<MockScene>) -> Self {
        Self {
            templates,
            scene: None,
            heading: 0,
            held: None,
            open: HashSet::new(),
            started: false,
            fail_start: false,
            fail_reset: false,
            stale_lookup: false,
            failing: HashSet::new(),
            issued: Vec::new(),
            resets: Vec::new(),
            last_observation: None,
            frame: None,
        }
    }

    /// Make `start` fail, as if the executable could not be launched.
    pub fn fail_start(mut self) -> Self {
        self.fail_start = true;
        self
    }

    /// Make every `reset` fail until switched back off.
    pub fn fail_reset(&mut self, fail: bool) {
        self.fail_reset = fail;
    }

    /// Force the native success flag of `kind` to false.
    pub fn fail_action(&mut self, kind: ActionKind) {
        self.failing.insert(kind);
    }

    /// Make [`Simulator::find_visible`] answer `None`, imitating an object
    /// list that went stale between the observation and the lookup.
    pub fn set_stale_lookup(&mut self, stale: bool) {
        self.stale_lookup = stale;
    }

    /// Every action received since construction, in order.
    pub fn issued(&self) -> &[Action] {
        &self.issued
    }

    /// Every `(scene, change_seed)` reset received, in order.
    pub fn resets(&self) -> &[(String, bool)] {
        &self.resets
    }

    pub fn is_started(&self) -> bool {
        self.started
    }

    pub fn heading(&self) -> u8 {
        self.heading
    }

    pub fn held(&self) -> Option<&str> {
        self.held.as_deref()
    }

    pub fn is_open(&self, object_id: &str) -> bool {
        self.open.contains(object_id)
    }

    fn load(&mut self, scene: &str) {
        let template = self
            .templates
            .iter()
            .find(|s| s.name == scene)
            .cloned()
            .unwrap_or_else(|| MockScene::kitchen(scene));
        self.scene = Some(template);
        self.heading = 0;
        self.held = None;
        self.open.clear();
        self.last_observation = Some(self.observe(true));
        self.frame = Some(self.render());
    }

    fn visible(&self, object: &MockObject) -> bool {
        object.visible_from.contains(&self.heading)
            && self.held.as_deref() != Some(object.object_id.as_str())
    }

    fn visible_object(&self, object_id: &str) -> bool {
        self.scene
            .iter()
            .flat_map(|s| s.objects.iter())
            .any(|o| o.object_id == object_id && self.visible(o))
    }

    fn observe(&self, last_action_success: bool) -> Observation {
        let objects = self
            .scene
            .iter()
            .flat_map(|s| s.objects.iter())
            .map(|o| ObjectState {
                object_type: o.object_type.clone(),
                object_id: o.object_id.clone(),
                visible: self.visible(o),
            })
            .collect();
        Observation {
            last_action_success,
            objects,
        }
    }

    fn render(&self) -> Frame {
        Frame {
            width: 1,
            height: 1,
            data: vec![
                self.heading,
                u8::from(self.held.is_some()),
                self.open.len() as u8,
            ],
        }
    }

    /// Apply `action` to the scene and report the native outcome.
    fn execute(&mut self, action: &Action) -> bool {
        let any_visible = self
            .scene
            .iter()
            .flat_map(|s| s.objects.iter())
            .any(|o| self.visible(o));

        match (action.action, action.object_id.as_deref()) {
            (ActionKind::MoveAhead | ActionKind::LookUp | ActionKind::LookDown, _) => true,
            (ActionKind::RotateLeft, _) => {
                self.heading = (self.heading + HEADINGS - 1) % HEADINGS;
                true
            }
            (ActionKind::RotateRight, _) => {
                self.heading = (self.heading + 1) % HEADINGS;
                true
            }
            (_, None) => any_visible,
            (ActionKind::PickupObject, Some(id)) => {
                if self.held.is_none() && self.visible_object(id) {
                    self.held = Some(id.to_string());
                    true
                } else {
                    false
                }
            }
            (ActionKind::OpenObject, Some(id)) => {
                self.visible_object(id) && self.open.insert(id.to_string())
            }
            (ActionKind::CloseObject, Some(id)) => self.visible_object(id) && self.open.remove(id),
            (ActionKind::PlaceHeldObject, Some(id)) => {
                if self.held.is_some() && self.visible_object(id) && self.open.contains(id) {
                    self.held = None;
                    true
                } else {
                    false
                }
            }
        }
    }
}

impl Default for MockSimulator {
    fn default() -> Self {
        Self::new()
    }
}

impl Simulator for MockSimulator {
    async fn start(&mut self, scene: &str, _gpu_id: usize) -> Result<()> {
        if self.fail_start {
            anyhow::bail!("mock simulator refused to launch");
        }
        self.started = true;
        self.load(scene);
        Ok(())
    }

    async fn reset(&mut self, scene: &str, change_seed: bool) -> Result<()> {
        if !self.started {
            anyhow::bail!("reset before start");
        }
        if self.fail_reset {
            anyhow::bail!("mock simulator failed to reset {scene}");
        }
        self.resets.push((scene.to_string(), change_seed));
        self.load(scene);
        Ok(())
    }

    async fn step(&mut self, action: &Action) -> Result<Observation> {
        if !self.started {
            anyhow::bail!("step before start");
        }
        self.issued.push(action.clone());

        let success = self.execute(action) && !self.failing.contains(&action.action);
        let observation = self.observe(success);
        self.last_observation = Some(observation.clone());
        self.frame = Some(self.render());
        Ok(observation)
    }

    fn last_observation(&self) -> Option<&Observation> {
        self.last_observation.as_ref()
    }

    fn current_frame(&self) -> Option<&Frame> {
        self.frame.as_ref()
    }

    fn find_visible(&self, object_type: &str) -> Option<String> {
        if self.stale_lookup {
            return None;
        }
        self.last_observation()?
            .find_visible(object_type)
            .map(|o| o.object_id.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rotation_changes_visibility() {
        let mut sim = MockSimulator::new();
        sim.start("FloorPlan1", 0).await.unwrap();

        let obs = sim.last_observation().unwrap();
        assert!(obs.is_visible("Tomato"));
        assert!(!obs.is_visible("Microwave"));

        let obs = sim.step(&Action::basic(ActionKind::RotateRight)).await.unwrap();
        assert!(obs.last_action_success);
        assert!(obs.is_visible("Tomato"));
        assert!(obs.is_visible("Microwave"));

        let obs = sim.step(&Action::basic(ActionKind::RotateLeft)).await.unwrap();
        assert!(!obs.is_visible("Microwave"));
        assert_eq!(sim.heading(), 0);
    }

    #[tokio::test]
    async fn targeted_interactions_follow_physical_rules() {
        let scene = MockScene::new("Box")
            .with_object(MockObject::everywhere("Tomato", "t1"))
            .with_object(MockObject::everywhere("Microwave", "m1"));
        let mut sim = MockSimulator::with_scenes(vec![scene]);
        sim.start("Box", 0).await.unwrap();

        // Placing into a closed container fails.
        let pickup = Action::targeted(ActionKind::PickupObject, "t1");
        let open = Action::targeted(ActionKind::OpenObject, "m1");
        let place = Action::targeted(ActionKind::PlaceHeldObject, "m1");
        let close = Action::targeted(ActionKind::CloseObject, "m1");

        assert!(sim.step(&pickup).await.unwrap().last_action_success);
        assert_eq!(sim.held(), Some("t1"));
        assert!(!sim.step(&place).await.unwrap().last_action_success);

        assert!(sim.step(&open).await.unwrap().last_action_success);
        assert!(sim.step(&place).await.unwrap().last_action_success);
        assert!(sim.held().is_none());

        assert!(sim.step(&close).await.unwrap().last_action_success);
        assert!(!sim.is_open("m1"));
    }

    #[tokio::test]
    async fn forced_failures_and_stale_lookup() {
        let mut sim = MockSimulator::new();
        sim.start("FloorPlan1", 0).await.unwrap();
        sim.fail_action(ActionKind::MoveAhead);

        let obs = sim.step(&Action::basic(ActionKind::MoveAhead)).await.unwrap();
        assert!(!obs.last_action_success);
        assert!(sim.find_visible("Tomato").is_some());

        sim.set_stale_lookup(true);
        assert!(sim.find_visible("Tomato").is_none());
    }

    #[tokio::test]
    async fn reset_restores_template_and_records_call() {
        let mut sim = MockSimulator::new();
        assert!(sim.step(&Action::basic(ActionKind::MoveAhead)).await.is_err());

        sim.start("FloorPlan1", 0).await.unwrap();
        sim.step(&Action::basic(ActionKind::RotateRight)).await.unwrap();
        sim.reset("FloorPlan2", false).await.unwrap();

        assert_eq!(sim.heading(), 0);
        assert_eq!(sim.resets(), &[("FloorPlan2".to_string(), false)]);
        assert_eq!(sim.issued().len(), 1);
    }

    #[tokio::test]
    async fn start_can_be_made_to_fail() {
        let mut sim = MockSimulator::new().fail_start();
        assert!(sim.start("FloorPlan1", 0).await.is_err());
        assert!(!sim.is_started());
    }
}
