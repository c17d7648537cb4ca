fn spawn_table() -> HashMap<&'static str, SpawnFn> {
    let mut table: HashMap<&'static str, SpawnFn> = HashMap::new();
    table.insert("teleport", spawn_teleport);
    table.insert("npc", spawn_npc);
    table.insert("enemy", spawn_enemy);
    table.insert("door", spawn_door);
    table.insert("chest", spawn_chest);
    table.insert("hurt", spawn_hurt);
    table.insert("tradeItem", spawn_trade_item);
    table.insert("trigger", spawn_trigger);
    table.insert("item", spawn_item);
    table
}

fn spawn_teleport(
    ctx: &SpawnContext<'_>,
    object: &MapObject,
) -> Result<Option<Entity>, BehaviorError> {
    let Some(map) = object.text("targetMap") else {
        warn!(object = object.id, "teleport_target_missing");
        return Ok(None);
    };
    let destination = TeleportTarget {
        map: map.to_string(),
        position: Vec2::new(
            object.float("targetPosX").unwrap_or(0.0),
            object.float("targetPosY").unwrap_or(0.0),
        ),
    };
    let mut pad = Entity::new("teleport", object.position(), rect_size(object));
    pad.object_id = Some(object.id);
    pad.flags.visible = false;
    pad.attach(Box::new(Teleport::new(ctx.player, destination)));
    Ok(Some(pad))
}

fn spawn_npc(ctx: &SpawnContext<'_>, object: &MapObject) -> Result<Option<Entity>, BehaviorError> {
    let key = object.text("sprite").unwrap_or(DEFAULT_SPRITE_KEY);
    let definition = ctx.assets.sprite_definition_by_key(key);
    let mut npc = entity_from_definition(key, definition, object.position());
    npc.object_id = Some(object.id);
    npc.flags.static_collision = true;

    let lines = ctx.assets.texts_by_key(object.text("texts").unwrap_or(key));
    let conversation = ctx.room.object_state(object.id).dialogue_index as usize;
    let dialogue = Dialogue::from_lines(ctx.player, lines, conversation)?.with_object_id(object.id);
    npc.attach(Box::new(dialogue));
    attach_behaviors(&mut npc, &definition.behaviors, definition, ctx)?;
    Ok(Some(npc))
}

fn spawn_enemy(
    ctx: &SpawnContext<'_>,
    object: &MapObject,
) -> Result<Option<Entity>, BehaviorError> {
    if ctx.room.object_state(object.id).defeated {
        return Ok(None);
    }
    let key = object.text("sprite").unwrap_or(DEFAULT_SPRITE_KEY);
    let definition = ctx.assets.sprite_definition_by_key(key);
    let mut enemy = entity_from_definition(key, definition, object.position());
    enemy.object_id = Some(object.id);
    enemy.flags.enemy = true;
    enemy.flags.can_hurt_player = true;
    apply_stat_overrides(&mut enemy, object);

    // Object-level behavior list replaces the sprite's.
    let behaviors: Vec<String> = match object.text("behaviors") {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .collect(),
        None => definition.behaviors.clone(),
    };
    attach_behaviors(&mut enemy, &behaviors, definition, ctx)?;
    Ok(Some(enemy))
}

fn spawn_door(ctx: &SpawnContext<'_>, object: &MapObject) -> Result<Option<Entity>, BehaviorError> {
    let open_mask = object
        .int("openState")
        .and_then(|mask| u32::try_from(mask).ok())
        .unwrap_or(0);
    if ctx.room.object_state(object.id).opened || open_mask & ctx.room.state() != 0 {
        return Ok(None);
    }
    let key = object.text("sprite").unwrap_or("door");
    let mut door = Entity::new(key, object.position(), rect_size(object));
    door.texture = ctx.assets.sprite_definition_by_key(key).texture.clone();
    door.object_id = Some(object.id);
    door.flags.static_collision = true;
    if object.flag("locked") {
        let lock = OpenLock::new(ctx.player, object.text("key").unwrap_or("key"))
            .with_object_id(object.id);
        door.attach(Box::new(lock));
    }
    Ok(Some(door))
}

fn spawn_chest(
    ctx: &SpawnContext<'_>,
    object: &MapObject,
) -> Result<Option<Entity>, BehaviorError> {
    let key = object.text("sprite").unwrap_or("chest");
    let definition = ctx.assets.sprite_definition_by_key(key);
    let opened = ctx.room.object_state(object.id).opened;
    let open_texture = format!("{}_open", definition.texture);

    let mut chest = entity_from_definition(key, definition, object.position());
    chest.object_id = Some(object.id);
    chest.flags.static_collision = true;
    if opened {
        chest.texture = open_texture.clone();
    }
    let item = object.text("item").unwrap_or("coin");
    let behavior = Chest::new(ctx.player, item, int_property(object, "amount", 1), opened)
        .with_object_id(object.id)
        .with_open_texture(open_texture);
    chest.attach(Box::new(behavior));
    Ok(Some(chest))
}

fn spawn_hurt(ctx: &SpawnContext<'_>, object: &MapObject) -> Result<Option<Entity>, BehaviorError> {
    let mut hazard = Entity::new("hurt", object.position(), rect_size(object));
    hazard.object_id = Some(object.id);
    hazard.damage = int_property(object, "damage", 1);
    hazard.knockback = object.float("knockback").unwrap_or(3.0);
    hazard.flags.can_hurt_player = true;
    hazard.flags.can_hurt_enemies = object.flag("hurtsEnemies");
    match object.text("sprite") {
        Some(key) => hazard.texture = ctx.assets.sprite_definition_by_key(key).texture.clone(),
        None => hazard.flags.visible = false,
    }
    Ok(Some(hazard))
}

fn spawn_trade_item(
    ctx: &SpawnContext<'_>,
    object: &MapObject,
) -> Result<Option<Entity>, BehaviorError> {
    if ctx.room.object_state(object.id).opened {
        return Ok(None);
    }
    let key = object.text("sprite").unwrap_or(DEFAULT_SPRITE_KEY);
    let definition = ctx.assets.sprite_definition_by_key(key);
    let mut offer = entity_from_definition(key, definition, object.position());
    offer.object_id = Some(object.id);
    let trade = TradeItem::new(
        ctx.player,
        object.text("currency").unwrap_or("coin"),
        int_property(object, "cost", 1),
        object.text("item").unwrap_or(key),
        int_property(object, "amount", 1),
    )
    .with_object_id(object.id);
    offer.attach(Box::new(trade));
    Ok(Some(offer))
}

fn spawn_trigger(
    ctx: &SpawnContext<'_>,
    object: &MapObject,
) -> Result<Option<Entity>, BehaviorError> {
    if ctx.room.object_state(object.id).opened {
        return Ok(None);
    }
    let Some(event) = object.text("event") else {
        warn!(object = object.id, "trigger_event_missing");
        return Ok(None);
    };
    let payload = object
        .text("value")
        .map_or(EventPayload::None, |value| EventPayload::Text(value.to_string()));
    let mut trigger = Entity::new("trigger", object.position(), rect_size(object));
    trigger.object_id = Some(object.id);
    trigger.flags.visible = false;
    trigger.attach(Box::new(
        Trigger::new(ctx.player, event, payload).with_object_id(object.id),
    ));
    Ok(Some(trigger))
}

fn spawn_item(ctx: &SpawnContext<'_>, object: &MapObject) -> Result<Option<Entity>, BehaviorError> {
    if ctx.room.object_state(object.id).opened {
        return Ok(None);
    }
    let key = object.text("sprite").unwrap_or(DEFAULT_SPRITE_KEY);
    let definition = ctx.assets.sprite_definition_by_key(key);
    let mut pickup = pickup_entity(key, definition, ctx.player, Some(object.id), object.position());
    pickup.object_id = Some(object.id);
    Ok(Some(pickup))
}

fn entity_from_definition(key: &str, definition: &SpriteDefinition, position: Vec2) -> Entity {
    let (hurtbox_w, hurtbox_h) = definition.hurtbox_size();
    let (offset_x, offset_y) = definition.hurtbox_offset;
    let mut entity = Entity::new(key, position, (definition.width, definition.height))
        .with_hurtbox(hurtbox_w, hurtbox_h, offset_x, offset_y);
    entity.texture = definition.texture.clone();
    entity.health = definition.health;
    entity.max_health = definition.health;
    entity.speed = definition.speed;
    entity.damage = definition.damage;
    entity.knockback = definition.knockback;
    entity.draw_layer = definition.draw_layer;
    entity
}

/// Heal when the definition restores health, otherwise an inventory pickup.
/// Map-placed pickups report their object id as opened when touched.
fn pickup_entity(
    key: &str,
    definition: &SpriteDefinition,
    player: EntityId,
    object_id: Option<u32>,
    position: Vec2,
) -> Entity {
    let mut pickup = entity_from_definition(key, definition, position);
    if definition.heal_amount > 0 {
        let heal = Heal::new(player, definition.heal_amount);
        let heal = match object_id {
            Some(id) => heal.with_object_id(id),
            None => heal,
        };
        pickup.attach(Box::new(heal));
    } else {
        let item = definition.item.clone().unwrap_or_else(|| key.to_string());
        let collect = CollectItem::new(player, item, definition.amount);
        let collect = match object_id {
            Some(id) => collect.with_object_id(id),
            None => collect,
        };
        pickup.attach(Box::new(collect));
    }
    pickup
}

/// Settings every map object may carry regardless of its kind: a hidden
/// flag and a `drawLayer` override.
fn apply_placement(entity: &mut Entity, object: &MapObject) {
    if !object.visible {
        entity.flags.visible = false;
    }
    if let Some(layer) = object
        .int("drawLayer")
        .and_then(|layer| i32::try_from(layer).ok())
    {
        entity.draw_layer = layer;
    }
}

fn attach_behaviors(
    entity: &mut Entity,
    names: &[String],
    definition: &SpriteDefinition,
    ctx: &SpawnContext<'_>,
) -> Result<(), BehaviorError> {
    for name in names {
        match name.as_str() {
            "watch" => entity.attach(Box::new(Watch::new(ctx.player))),
            "random_walk" => entity.attach(Box::new(RandomWalk::new())),
            "chase" => entity.attach(Box::new(Chase::new(
                ctx.player,
                definition.aggro_distance,
                definition.deaggro_distance,
                definition.min_distance,
            )?)),
            "shoot" => entity.attach(Box::new(Shoot::new(
                ctx.player,
                definition.shoot_interval_seconds,
                definition.shoot_range,
                projectile_spec(ctx.assets, definition),
            )?)),
            other => warn!(sprite = %entity.name, behavior = other, "sprite_behavior_unknown"),
        }
    }
    Ok(())
}

fn projectile_spec(assets: &dyn AssetProvider, shooter: &SpriteDefinition) -> ProjectileSpec {
    let Some(key) = shooter.projectile.as_deref() else {
        return ProjectileSpec::default();
    };
    let projectile = assets.sprite_definition_by_key(key);
    ProjectileSpec {
        texture: projectile.texture.clone(),
        size: (projectile.width, projectile.height),
        speed: projectile.speed,
        damage: projectile.damage,
        lifetime_seconds: projectile.lifetime_seconds,
        turn_rate: projectile.turn_rate,
    }
}

fn apply_stat_overrides(entity: &mut Entity, object: &MapObject) {
    if let Some(health) = object.int("health").and_then(|value| i32::try_from(value).ok()) {
        entity.health = health;
        entity.max_health = health;
    }
    if let Some(speed) = object.float("speed") {
        entity.speed = speed;
    }
    if let Some(damage) = object.int("damage").and_then(|value| i32::try_from(value).ok()) {
        entity.damage = damage;
    }
}

fn int_property(object: &MapObject, key: &str, default: i32) -> i32 {
    object
        .int(key)
        .and_then(|value| i32::try_from(value).ok())
        .unwrap_or(default)
}

fn rect_size(object: &MapObject) -> (i32, i32) {
    (object.rect.w, object.rect.h)
}
