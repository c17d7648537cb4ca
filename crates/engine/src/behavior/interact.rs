//! Behaviors gated on the actor standing close and pressing confirm.

use crate::app::InputAction;
use crate::entity::EntityId;
use crate::events::{keys, EventPayload};

use super::{Behavior, BehaviorContext, BehaviorError, BehaviorKind};

/// Separates conversations inside a text table.
pub const CONVERSATION_SEPARATOR: &str = "---";

fn publish_text(ctx: &mut BehaviorContext<'_>, key: &str, text: &str) {
    ctx.events.publish(key, EventPayload::Text(text.to_string()));
}

pub(super) fn publish_opened(ctx: &mut BehaviorContext<'_>, object_id: Option<u32>) {
    if let Some(object_id) = object_id {
        ctx.events
            .publish(&keys::object_opened(object_id), EventPayload::None);
    }
}

fn publish_item(ctx: &mut BehaviorContext<'_>, item: &str, amount: i32) {
    ctx.events.publish(
        keys::ITEM_DELTA,
        EventPayload::Item {
            key: item.to_string(),
            amount,
        },
    );
}

/// Multi-line conversation. Each completed conversation advances to the next
/// one (the last one repeats) and reports the new index for persistence.
#[derive(Debug, Clone)]
pub struct Dialogue {
    target: EntityId,
    object_id: Option<u32>,
    conversations: Vec<Vec<String>>,
    conversation: usize,
    line: Option<usize>,
}

impl Dialogue {
    pub fn new(
        target: EntityId,
        conversations: Vec<Vec<String>>,
        start_conversation: usize,
    ) -> Result<Self, BehaviorError> {
        if conversations.is_empty() || conversations.iter().any(Vec::is_empty) {
            return Err(BehaviorError::EmptyContent {
                behavior: BehaviorKind::Dialogue,
            });
        }
        let conversation = start_conversation.min(conversations.len() - 1);
        Ok(Self {
            target,
            object_id: None,
            conversations,
            conversation,
            line: None,
        })
    }

    /// Splits a flat text table into conversations on separator lines.
    pub fn from_lines(
        target: EntityId,
        lines: &[String],
        start_conversation: usize,
    ) -> Result<Self, BehaviorError> {
        let mut conversations = vec![Vec::new()];
        for line in lines {
            if line.trim() == CONVERSATION_SEPARATOR {
                conversations.push(Vec::new());
            } else if let Some(current) = conversations.last_mut() {
                current.push(line.clone());
            }
        }
        conversations.retain(|conversation| !conversation.is_empty());
        Self::new(target, conversations, start_conversation)
    }

    pub fn with_object_id(mut self, object_id: u32) -> Self {
        self.object_id = Some(object_id);
        self
    }

    pub fn is_talking(&self) -> bool {
        self.line.is_some()
    }

    pub fn conversation_index(&self) -> usize {
        self.conversation
    }

    fn finish_conversation(&mut self, ctx: &mut BehaviorContext<'_>) {
        self.line = None;
        ctx.events.publish(keys::HIDE_TEXT, EventPayload::None);
        ctx.interaction.close_textbox();
        if self.conversation + 1 < self.conversations.len() {
            self.conversation += 1;
            if let Some(object_id) = self.object_id {
                ctx.events.publish(
                    &keys::dialogue_progress(object_id),
                    EventPayload::Number(self.conversation as f32),
                );
            }
        }
    }
}

impl Behavior for Dialogue {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Dialogue
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        let lines = &self.conversations[self.conversation];
        match self.line {
            None => {
                if ctx.interaction_requested(self.target) {
                    ctx.interaction.open_textbox();
                    publish_text(ctx, keys::SHOW_TEXT, &lines[0]);
                    self.line = Some(0);
                }
            }
            Some(_) if ctx.entity(self.target).is_none() => self.finish_conversation(ctx),
            Some(line) => {
                if !ctx.input.just_pressed(InputAction::Confirm) {
                    return Ok(());
                }
                let next = line + 1;
                if let Some(text) = lines.get(next) {
                    publish_text(ctx, keys::SHOW_TEXT, text);
                    self.line = Some(next);
                } else {
                    self.finish_conversation(ctx);
                }
            }
        }
        Ok(())
    }
}

/// Exchanges `price` of one item for `amount` of another, once.
#[derive(Debug, Clone)]
pub struct TradeItem {
    target: EntityId,
    object_id: Option<u32>,
    price_item: String,
    price: i32,
    item: String,
    amount: i32,
    done: bool,
}

impl TradeItem {
    pub fn new(
        target: EntityId,
        price_item: impl Into<String>,
        price: i32,
        item: impl Into<String>,
        amount: i32,
    ) -> Self {
        Self {
            target,
            object_id: None,
            price_item: price_item.into(),
            price,
            item: item.into(),
            amount,
            done: false,
        }
    }

    pub fn with_object_id(mut self, object_id: u32) -> Self {
        self.object_id = Some(object_id);
        self
    }
}

impl Behavior for TradeItem {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::TradeItem
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        if !ctx.interaction_requested(self.target) {
            return Ok(());
        }
        ctx.interaction.start_cooldown();
        if !ctx.inventory.has(&self.price_item, self.price) {
            let notice = format!("You need {} {}.", self.price, self.price_item);
            publish_text(ctx, keys::NOTICE, &notice);
            return Ok(());
        }

        ctx.inventory.add(&self.price_item, -self.price);
        ctx.inventory.add(&self.item, self.amount);
        publish_item(ctx, &self.price_item, -self.price);
        publish_item(ctx, &self.item, self.amount);
        let notice = format!("Got {} {}!", self.amount, self.item);
        publish_text(ctx, keys::NOTICE, &notice);
        publish_opened(ctx, self.object_id);
        ctx.despawn_owner();
        self.done = true;
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.done
    }
}

/// A container that hands out its contents once. The opened flag is restored
/// from persisted object state when the room reloads.
#[derive(Debug, Clone)]
pub struct Chest {
    target: EntityId,
    object_id: Option<u32>,
    item: String,
    amount: i32,
    open_texture: Option<String>,
    opened: bool,
}

impl Chest {
    pub fn new(target: EntityId, item: impl Into<String>, amount: i32, opened: bool) -> Self {
        Self {
            target,
            object_id: None,
            item: item.into(),
            amount,
            open_texture: None,
            opened,
        }
    }

    pub fn with_object_id(mut self, object_id: u32) -> Self {
        self.object_id = Some(object_id);
        self
    }

    pub fn with_open_texture(mut self, texture: impl Into<String>) -> Self {
        self.open_texture = Some(texture.into());
        self
    }
}

impl Behavior for Chest {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::Chest
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        if self.opened || !ctx.interaction_requested(self.target) {
            return Ok(());
        }
        self.opened = true;
        ctx.interaction.start_cooldown();
        ctx.inventory.add(&self.item, self.amount);
        publish_item(ctx, &self.item, self.amount);
        let notice = format!("Found {} {}!", self.amount, self.item);
        publish_text(ctx, keys::NOTICE, &notice);
        publish_opened(ctx, self.object_id);
        if let Some(texture) = self.open_texture.clone() {
            if let Some(owner) = ctx.owner_mut() {
                owner.texture = texture;
            }
        }
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.opened
    }
}

/// A locked door that consumes one `key_item` to open.
#[derive(Debug, Clone)]
pub struct OpenLock {
    target: EntityId,
    object_id: Option<u32>,
    key_item: String,
    opened: bool,
}

impl OpenLock {
    pub fn new(target: EntityId, key_item: impl Into<String>) -> Self {
        Self {
            target,
            object_id: None,
            key_item: key_item.into(),
            opened: false,
        }
    }

    pub fn with_object_id(mut self, object_id: u32) -> Self {
        self.object_id = Some(object_id);
        self
    }
}

impl Behavior for OpenLock {
    fn kind(&self) -> BehaviorKind {
        BehaviorKind::OpenLock
    }

    fn update(&mut self, ctx: &mut BehaviorContext<'_>) -> Result<(), BehaviorError> {
        if !ctx.interaction_requested(self.target) {
            return Ok(());
        }
        ctx.interaction.start_cooldown();
        if !ctx.inventory.has(&self.key_item, 1) {
            publish_text(ctx, keys::NOTICE, "It's locked.");
            return Ok(());
        }

        ctx.inventory.add(&self.key_item, -1);
        publish_item(ctx, &self.key_item, -1);
        ctx.events
            .publish(keys::PLAY_SOUND, EventPayload::Text("unlock".to_string()));
        publish_opened(ctx, self.object_id);
        ctx.despawn_owner();
        self.opened = true;
        Ok(())
    }

    fn is_done(&self) -> bool {
        self.opened
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::behavior::test_support::Harness;
    use crate::entity::Entity;
    use crate::geometry::Vec2;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|line| line.to_string()).collect()
    }

    fn shown(harness: &Harness) -> Option<String> {
        harness
            .events
            .latest(keys::SHOW_TEXT)
            .and_then(EventPayload::as_text)
            .map(str::to_string)
    }

    fn confirm(harness: &mut Harness, owner: EntityId) {
        harness.press_confirm();
        harness.run(owner);
        harness.release_all();
        harness.run(owner);
    }

    fn scene_with_player(harness: &mut Harness) -> EntityId {
        harness.spawn_at("player", 20.0, 0.0)
    }

    #[test]
    fn dialogue_walks_lines_then_advances_conversation() {
        let mut harness = Harness::new();
        let player = scene_with_player(&mut harness);
        let texts = lines(&["Hello.", "Nice day.", "---", "Back again?"]);
        let dialogue = Dialogue::from_lines(player, &texts, 0)
            .expect("dialogue")
            .with_object_id(9);
        let npc = harness.spawn(Entity::new("npc", Vec2::ZERO, (16, 16)).with_behavior(dialogue));

        confirm(&mut harness, npc);
        assert_eq!(shown(&harness).as_deref(), Some("Hello."));
        assert!(harness.interaction.textbox_open);

        confirm(&mut harness, npc);
        assert_eq!(shown(&harness).as_deref(), Some("Nice day."));

        confirm(&mut harness, npc);
        assert!(!harness.interaction.textbox_open);
        assert!(harness.events.has(keys::HIDE_TEXT));
        assert_eq!(
            harness.events.latest(&keys::dialogue_progress(9)),
            Some(&EventPayload::Number(1.0))
        );

        harness.interaction.reset();
        confirm(&mut harness, npc);
        assert_eq!(shown(&harness).as_deref(), Some("Back again?"));
    }

    #[test]
    fn dialogue_ignores_confirm_out_of_range() {
        let mut harness = Harness::new();
        let player = harness.spawn_at("player", 200.0, 0.0);
        let dialogue = Dialogue::from_lines(player, &lines(&["Hi."]), 0).expect("dialogue");
        let npc = harness.spawn(Entity::new("npc", Vec2::ZERO, (16, 16)).with_behavior(dialogue));

        confirm(&mut harness, npc);
        assert!(!harness.events.has(keys::SHOW_TEXT));
    }

    #[test]
    fn dialogue_without_lines_is_rejected() {
        let error = Dialogue::from_lines(EntityId(0), &lines(&["---"]), 0).expect_err("empty");
        assert_eq!(
            error,
            BehaviorError::EmptyContent {
                behavior: BehaviorKind::Dialogue
            }
        );
    }

    #[test]
    fn persisted_conversation_index_is_clamped() {
        let dialogue = Dialogue::from_lines(EntityId(0), &lines(&["a", "---", "b"]), 7)
            .expect("dialogue");
        assert_eq!(dialogue.conversation_index(), 1);
    }

    #[test]
    fn chest_opens_once_and_reports_object() {
        let mut harness = Harness::new();
        let player = scene_with_player(&mut harness);
        let chest = Chest::new(player, "coin", 5, false)
            .with_object_id(3)
            .with_open_texture("chest_open");
        let chest = harness.spawn(Entity::new("chest", Vec2::ZERO, (16, 16)).with_behavior(chest));

        confirm(&mut harness, chest);
        harness.interaction.reset();
        confirm(&mut harness, chest);

        assert_eq!(harness.inventory.count("coin"), 5);
        assert!(harness.events.has(&keys::object_opened(3)));
        assert_eq!(harness.world.get(chest).expect("chest").texture, "chest_open");
    }

    #[test]
    fn already_opened_chest_gives_nothing() {
        let mut harness = Harness::new();
        let player = scene_with_player(&mut harness);
        let chest = harness.spawn(
            Entity::new("chest", Vec2::ZERO, (16, 16))
                .with_behavior(Chest::new(player, "coin", 5, true)),
        );
        confirm(&mut harness, chest);
        assert_eq!(harness.inventory.count("coin"), 0);
    }

    #[test]
    fn lock_requires_key_and_consumes_it() {
        let mut harness = Harness::new();
        let player = scene_with_player(&mut harness);
        let door = harness.spawn(
            Entity::new("door", Vec2::ZERO, (16, 16))
                .with_behavior(OpenLock::new(player, "key").with_object_id(4)),
        );

        confirm(&mut harness, door);
        assert_eq!(
            harness.events.latest(keys::NOTICE),
            Some(&EventPayload::Text("It's locked.".to_string()))
        );
        assert!(harness.world.get(door).is_some());

        harness.inventory.add("key", 1);
        harness.interaction.reset();
        confirm(&mut harness, door);
        assert!(harness.world.get(door).is_none());
        assert_eq!(harness.inventory.count("key"), 0);
        assert!(harness.events.has(&keys::object_opened(4)));
    }

    #[test]
    fn trade_checks_price_before_exchanging() {
        let mut harness = Harness::new();
        let player = scene_with_player(&mut harness);
        let shop = harness.spawn(
            Entity::new("potion", Vec2::ZERO, (16, 16))
                .with_behavior(TradeItem::new(player, "coin", 3, "potion", 1)),
        );

        harness.inventory.add("coin", 2);
        confirm(&mut harness, shop);
        assert_eq!(harness.inventory.count("potion"), 0);

        harness.inventory.add("coin", 2);
        harness.interaction.reset();
        confirm(&mut harness, shop);
        assert_eq!(harness.inventory.count("potion"), 1);
        assert_eq!(harness.inventory.count("coin"), 1);
        assert!(harness.world.get(shop).is_none());
    }
}
