/// Top-down dungeon crawl: one room of the dungeon is live at a time, the
/// player entity persists across room loads.
pub(crate) struct GameplayScene {
    settings: Settings,
    save_path: PathBuf,
    dungeon: Dungeon,
    world: EntityWorld,
    inventory: Inventory,
    interaction: InteractionState,
    rng: ChaCha8Rng,
    camera: Camera2D,
    viewport: Viewport,
    cutscene: CommandQueue,
    spawners: HashMap<&'static str, SpawnFn>,
    tilemap: Option<Rc<Tilemap>>,
    walls: Vec<Rect>,
    room_bounds: Rect,
    player: EntityId,
    weapon: Option<EntityId>,
    effects: EffectQueue,
    room_generation: Rc<Cell<u64>>,
    enemies_alive: Rc<Cell<usize>>,
    scene_listener_keys: Vec<String>,
    room_listener_keys: Vec<String>,
    published_vitals: Option<(i32, i32)>,
    published_inventory: Option<String>,
}

impl GameplayScene {
    pub(crate) fn new(settings: Settings, save_path: PathBuf, dungeon: Dungeon) -> Self {
        let (room_w, room_h) = settings.room_pixel_size();
        Self {
            interaction: InteractionState::new(
                settings.textbox_cooldown_seconds,
                settings.interaction_range,
            ),
            rng: ChaCha8Rng::seed_from_u64(settings.rng_seed),
            viewport: Viewport {
                width: settings.viewport_width,
                height: settings.viewport_height,
            },
            settings,
            save_path,
            dungeon,
            world: EntityWorld::default(),
            inventory: Inventory::new(),
            camera: Camera2D::default(),
            cutscene: CommandQueue::new(),
            spawners: spawn_table(),
            tilemap: None,
            walls: Vec::new(),
            room_bounds: Rect::new(0, 0, room_w, room_h),
            player: EntityId::UNASSIGNED,
            weapon: None,
            effects: Rc::new(RefCell::new(Vec::new())),
            room_generation: Rc::new(Cell::new(0)),
            enemies_alive: Rc::new(Cell::new(0)),
            scene_listener_keys: Vec::new(),
            room_listener_keys: Vec::new(),
            published_vitals: None,
            published_inventory: None,
        }
    }

    fn subscribe_scene_listeners(&mut self, events: &mut EventBus) {
        let listener_keys = &mut self.scene_listener_keys;
        let effects = &self.effects;
        subscribe_effect(events, listener_keys, effects, keys::TELEPORT.to_string(), |payload| {
            payload.as_teleport().cloned().map(RoomEffect::Teleport)
        });
        subscribe_effect(
            events,
            listener_keys,
            effects,
            keys::WEAPON_FINISHED.to_string(),
            |_| Some(RoomEffect::WeaponFinished),
        );
        subscribe_effect(
            events,
            listener_keys,
            effects,
            keys::START_CUTSCENE.to_string(),
            |payload| {
                payload
                    .as_text()
                    .map(|name| RoomEffect::StartCutscene(name.to_string()))
            },
        );
        subscribe_effect(
            events,
            listener_keys,
            effects,
            keys::ROOM_CLEARED.to_string(),
            |payload| {
                payload.as_number().map(|room| RoomEffect::RoomCleared {
                    room: room as usize,
                })
            },
        );
    }

    fn unsubscribe_all(&mut self, events: &mut EventBus) {
        for key in self.scene_listener_keys.drain(..) {
            events.unsubscribe(&key);
        }
        self.clear_room_listeners(events);
    }

    fn clear_room_listeners(&mut self, events: &mut EventBus) {
        for key in self.room_listener_keys.drain(..) {
            events.unsubscribe(&key);
        }
    }

    fn spawn_player(&mut self, assets: &dyn AssetProvider) -> EntityId {
        let key = self.settings.player_sprite.clone();
        let definition = assets.sprite_definition_by_key(&key);
        let mut player = entity_from_definition(&key, definition, Vec2::ZERO);
        player.friction = self.settings.friction;
        player.flags.persistent = true;
        player.set_center(self.room_bounds.center());
        self.world.spawn(player)
    }

    /// Replaces the live room with the dungeon's current room: despawns the
    /// previous room's entities, rebuilds walls and bounds, spawns the
    /// objects that exist in the room's state and registers their listeners.
    fn load_room(&mut self, events: &mut EventBus, assets: &dyn AssetProvider) {
        self.clear_room_listeners(events);
        let generation = self.room_generation.get() + 1;
        self.room_generation.set(generation);

        let leaving: Vec<EntityId> = self
            .world
            .entities()
            .iter()
            .filter(|entity| !entity.flags.persistent)
            .map(|entity| entity.id)
            .collect();
        for id in leaving {
            self.world.despawn(id);
        }
        self.weapon = None;
        // The speaker may be gone; never carry an open textbox into the room.
        if self.interaction.textbox_open {
            events.publish(keys::HIDE_TEXT, EventPayload::None);
        }
        self.interaction.reset();

        let index = self.dungeon.current_room_index();
        self.tilemap = self.dungeon.load_current_tilemap(assets);
        let (room_w, room_h) = self.settings.room_pixel_size();
        self.room_bounds = self
            .tilemap
            .as_ref()
            .map_or(Rect::new(0, 0, room_w, room_h), |tilemap| tilemap.pixel_bounds());
        self.walls = self
            .tilemap
            .as_ref()
            .map(|tilemap| tilemap.walls())
            .unwrap_or_default();

        let Some(tilemap) = self.tilemap.clone() else {
            warn!(room = index, "room_without_tilemap");
            self.enemies_alive.set(0);
            return;
        };
        let room = match self.dungeon.current_room() {
            Ok(room) => room,
            Err(error) => {
                warn!(room = index, error = %error, "room_load_failed");
                self.enemies_alive.set(0);
                return;
            }
        };
        let room_state = room.state();
        let spawn_ctx = SpawnContext {
            assets,
            player: self.player,
            room,
        };

        let mut spawned = 0usize;
        let mut enemies = 0usize;
        for object in tilemap.objects() {
            if object.kind != MapObjectKind::Sprite || !room.object_exists(object.state_mask()) {
                continue;
            }
            let Some(spawner) = self.spawners.get(object.name.as_str()) else {
                warn!(room = index, object = object.id, name = %object.name, "object_spawn_unknown");
                continue;
            };
            let mut entity = match spawner(&spawn_ctx, object) {
                Ok(Some(entity)) => entity,
                Ok(None) => continue,
                Err(error) => {
                    warn!(room = index, object = object.id, error = %error, "object_spawn_failed");
                    continue;
                }
            };
            apply_placement(&mut entity, object);

            let object_id = object.id;
            let is_enemy = entity.flags.enemy;
            let reports_opened = [
                BehaviorKind::Chest,
                BehaviorKind::OpenLock,
                BehaviorKind::TradeItem,
                BehaviorKind::Trigger,
                BehaviorKind::Heal,
                BehaviorKind::CollectItem,
            ]
            .into_iter()
            .any(|kind| entity.has_behavior(kind));
            let talks = entity.has_behavior(BehaviorKind::Dialogue);
            let id = self.world.spawn(entity);
            spawned += 1;

            let listener_keys = &mut self.room_listener_keys;
            if reports_opened {
                subscribe_effect(
                    events,
                    listener_keys,
                    &self.effects,
                    keys::object_opened(object_id),
                    move |_| Some(RoomEffect::ObjectOpened { room: index, object_id }),
                );
            }
            if talks {
                subscribe_effect(
                    events,
                    listener_keys,
                    &self.effects,
                    keys::dialogue_progress(object_id),
                    move |payload| {
                        payload.as_number().map(|conversation| RoomEffect::DialogueProgress {
                            room: index,
                            object_id,
                            conversation: conversation as u32,
                        })
                    },
                );
            }
            if is_enemy {
                enemies += 1;
                subscribe_effect(
                    events,
                    listener_keys,
                    &self.effects,
                    keys::kill_entity(id),
                    move |_| Some(RoomEffect::EnemyDefeated { room: index, object_id }),
                );
            }
        }

        info!(
            room = index,
            tilemap = tilemap.key(),
            state = room_state,
            spawned,
            enemies,
            "room_loaded"
        );
        self.enemies_alive.set(enemies);
        if enemies > 0 {
            schedule_room_clear(
                events,
                &self.room_generation,
                &self.enemies_alive,
                index,
                generation,
            );
        }
    }

    fn handle_persistence_requests(&mut self, events: &mut EventBus, assets: &dyn AssetProvider) {
        if events.take(SAVE_REQUESTED_KEY).is_some() {
            let notice = match self.save_game() {
                Ok(()) => "Game saved.",
                Err(error) => {
                    warn!(path = %self.save_path.display(), error = %error, "save_failed");
                    "Save failed."
                }
            };
            events.publish(keys::NOTICE, EventPayload::Text(notice.to_string()));
        }
        if events.take(LOAD_REQUESTED_KEY).is_some() {
            let notice = match self.load_game(events, assets) {
                Ok(()) => "Game loaded.",
                Err(error) => {
                    warn!(path = %self.save_path.display(), error = %error, "load_failed");
                    "No save to load."
                }
            };
            events.publish(keys::NOTICE, EventPayload::Text(notice.to_string()));
        }
    }

    fn save_game(&self) -> Result<(), SaveError> {
        let player = self
            .world
            .get(self.player)
            .map_or(PlayerData { health: 1, max_health: 1 }, |player| PlayerData {
                health: player.health,
                max_health: player.max_health,
            });
        SaveGame::capture(player, &self.inventory, &self.dungeon).write(&self.save_path)
    }

    /// Restores the saved dungeon and inventory, then restarts from the
    /// starting room. A failed read leaves the running game untouched.
    fn load_game(
        &mut self,
        events: &mut EventBus,
        assets: &dyn AssetProvider,
    ) -> Result<(), SaveError> {
        let save = SaveGame::read(&self.save_path)?;
        self.dungeon = load_dungeon(&save.dungeon)?;
        self.inventory = save.items;
        self.published_inventory = None;
        self.cutscene.clear();
        self.load_room(events, assets);

        let center = self.room_bounds.center();
        if let Some(player) = self.world.get_mut(self.player) {
            player.max_health = save.player.max_health.max(1);
            player.health = save.player.health.clamp(1, player.max_health);
            player.velocity = Vec2::ZERO;
            player.set_center(center);
        }
        info!(path = %self.save_path.display(), room = self.dungeon.current_room_index(), "game_loaded");
        Ok(())
    }

    fn steer_player(&mut self, input: &InputSnapshot, assets: &dyn AssetProvider) {
        let textbox_open = self.interaction.textbox_open;
        let Some(player) = self.world.get_mut(self.player) else {
            return;
        };
        if textbox_open {
            player.acceleration = Vec2::ZERO;
            return;
        }
        let movement = input.movement_vector();
        player.acceleration = movement;
        if let Some(facing) = Direction::from_vector(movement) {
            player.facing = facing;
        }
        if input.just_pressed(InputAction::Attack) {
            self.swing_weapon(assets);
        }
    }

    fn swing_weapon(&mut self, assets: &dyn AssetProvider) {
        if self.weapon.is_some() {
            return;
        }
        let Some(center) = self.world.get(self.player).map(Entity::center) else {
            return;
        };
        let definition = assets.sprite_definition_by_key(SWORD_SPRITE_KEY);
        let weapon = match Weapon::new(
            self.player,
            definition.lifetime_seconds,
            SWORD_SWEEP_RADIANS,
            SWORD_REACH,
        ) {
            Ok(weapon) => weapon,
            Err(error) => {
                warn!(error = %error, "weapon_invalid");
                return;
            }
        };
        let mut sword = entity_from_definition(SWORD_SPRITE_KEY, definition, Vec2::ZERO);
        sword.set_center(center);
        sword.flags.can_hurt_enemies = true;
        sword.attach(Box::new(weapon));
        self.weapon = Some(self.world.spawn(sword));
    }

    fn run_behaviors(&mut self, dt_seconds: f32, input: &InputSnapshot, events: &mut EventBus) {
        let tile_size = self.settings.tile_size as i32;
        for id in self.world.ids() {
            if self
                .world
                .get(id)
                .map_or(true, |entity| entity.behaviors.is_empty())
            {
                continue;
            }
            let mut obstacles = self.walls.clone();
            obstacles.extend(self.world.static_obstacles(id));
            let mut ctx = BehaviorContext {
                owner: id,
                dt_seconds,
                world: &mut self.world,
                events: &mut *events,
                input,
                inventory: &mut self.inventory,
                interaction: &mut self.interaction,
                rng: &mut self.rng,
                obstacles: &obstacles,
                room_bounds: self.room_bounds,
                tile_size,
            };
            execute_behaviors(&mut ctx);
        }
    }

    /// Physics step for every live entity: integrate, resolve against walls
    /// and static bodies, keep non-player bodies inside the room, animate.
    fn integrate(&mut self, dt_seconds: f32, assets: &dyn AssetProvider) {
        let statics: Vec<(EntityId, Rect)> = self
            .world
            .entities()
            .iter()
            .filter(|entity| entity.flags.static_collision && !entity.is_marked_for_deletion())
            .map(|entity| (entity.id, entity.rect()))
            .collect();
        let bounds = self.room_bounds;
        let player = self.player;
        let mut escaped = Vec::new();

        for entity in self.world.entities_mut() {
            if entity.is_marked_for_deletion() {
                continue;
            }
            let previous = entity.position();
            entity.update(dt_seconds);

            let is_projectile = entity.has_behavior(BehaviorKind::Projectile);
            if !entity.flags.static_collision && !entity.has_behavior(BehaviorKind::Weapon) {
                let obstacles: Vec<Rect> = self
                    .walls
                    .iter()
                    .copied()
                    .chain(
                        statics
                            .iter()
                            .filter(|(id, _)| *id != entity.id)
                            .map(|(_, rect)| *rect),
                    )
                    .collect();
                resolve_static(entity, previous, &obstacles);
            }
            if is_projectile {
                if !entity.rect().intersects(&bounds) {
                    escaped.push(entity.id);
                }
            } else if entity.id != player {
                clamp_inside(entity, bounds);
            }

            if entity.flags.visible && !entity.texture.is_empty() {
                let frames = assets.textures_by_key(&entity.texture).frame_count;
                entity.animate(dt_seconds, frames);
            }
        }
        for id in escaped {
            self.world.despawn(id);
        }
    }

    fn resolve_contacts(&mut self, events: &mut EventBus, assets: &dyn AssetProvider) {
        let player = self.player;
        let mut pairs = Vec::new();
        let entities = self.world.entities();
        for source in entities {
            for target in entities {
                if source.id != target.id
                    && !source.is_marked_for_deletion()
                    && !target.is_marked_for_deletion()
                    && is_hostile(source, target, target.id == player)
                {
                    pairs.push((source.id, target.id));
                }
            }
        }

        let mut player_defeated = false;
        for (source, target) in pairs {
            let iframe_seconds = if target == player {
                self.settings.iframe_duration_seconds
            } else {
                ENEMY_IFRAME_SECONDS
            };
            let Some((source_entity, target_entity)) = self.world.get_pair_mut(source, target)
            else {
                continue;
            };
            let Some(outcome) = apply_contact_damage(source_entity, target_entity, iframe_seconds)
            else {
                continue;
            };
            let spent = source_entity.has_behavior(BehaviorKind::Projectile);
            let enemy_killed = target_entity.flags.enemy && outcome.killed();
            debug!(
                source = source.0,
                target = target.0,
                damage = outcome.damage,
                remaining = outcome.remaining_health,
                "contact_damage"
            );
            if spent {
                self.world.despawn(source);
            }
            if target == player {
                player_defeated |= outcome.killed();
            } else if enemy_killed {
                self.defeat_enemy(target, events);
            }
        }
        if player_defeated {
            self.respawn_player(events, assets);
        }
    }

    fn defeat_enemy(&mut self, id: EntityId, events: &mut EventBus) {
        let Some(enemy) = self.world.get_mut(id) else {
            return;
        };
        enemy.behaviors.clear();
        enemy.flags.can_hurt_player = false;
        enemy.velocity = Vec2::ZERO;
        enemy.attach(Box::new(Death::default()));
        match Emitter::new(40.0, 0.3, 30.0) {
            Ok(puff) => enemy.attach(Box::new(puff.with_duration(DEATH_PUFF_SECONDS))),
            Err(error) => warn!(error = %error, "death_puff_invalid"),
        }
        info!(entity = id.0, name = %enemy.name, object = ?enemy.object_id, "enemy_defeated");
        events.publish(&keys::kill_entity(id), EventPayload::Entity(id));
    }

    fn respawn_player(&mut self, events: &mut EventBus, assets: &dyn AssetProvider) {
        info!(room = self.dungeon.current_room_index(), "player_defeated");
        events.publish(keys::PLAYER_DEFEATED, EventPayload::None);
        if let Err(error) = self.dungeon.set_current_room(self.dungeon.starting_room()) {
            warn!(error = %error, "respawn_room_missing");
        }
        self.load_room(events, assets);

        let center = self.room_bounds.center();
        if let Some(player) = self.world.get_mut(self.player) {
            player.health = player.max_health;
            player.velocity = Vec2::ZERO;
            player.iframe_timer = 0.0;
            player.effect = None;
            player.set_center(center);
        }
        events.publish(
            keys::NOTICE,
            EventPayload::Text("You wake up back at the entrance.".to_string()),
        );
    }

    /// Removes dissolved enemies and drops their loot where they fell.
    fn finish_deaths(&mut self, assets: &dyn AssetProvider) {
        let finished: Vec<(EntityId, String, Vec2)> = self
            .world
            .entities()
            .iter()
            .filter(|entity| {
                !entity.is_marked_for_deletion() && entity.behavior_finished(BehaviorKind::Death)
            })
            .map(|entity| (entity.id, entity.name.clone(), entity.center()))
            .collect();
        for (id, name, center) in finished {
            self.world.despawn(id);
            let Some(drop) = assets.sprite_definition_by_key(&name).drop.clone() else {
                continue;
            };
            let definition = assets.sprite_definition_by_key(&drop);
            let mut pickup = pickup_entity(&drop, definition, self.player, None, Vec2::ZERO);
            pickup.set_center(center);
            self.world.spawn(pickup);
            debug!(entity = id.0, drop = %drop, "enemy_drop_spawned");
        }
    }

    fn drain_effects(&mut self, events: &mut EventBus, assets: &dyn AssetProvider) {
        let effects: Vec<RoomEffect> = self.effects.borrow_mut().drain(..).collect();
        for effect in effects {
            match effect {
                RoomEffect::ObjectOpened { room, object_id } => {
                    self.update_object_state(room, object_id, |state| state.opened = true);
                }
                RoomEffect::DialogueProgress {
                    room,
                    object_id,
                    conversation,
                } => self.update_object_state(room, object_id, |state| {
                    state.dialogue_index = conversation;
                }),
                RoomEffect::EnemyDefeated { room, object_id } => {
                    self.update_object_state(room, object_id, |state| state.defeated = true);
                }
                RoomEffect::Teleport(target) => self.teleport(&target, events, assets),
                RoomEffect::WeaponFinished => self.weapon = None,
                RoomEffect::StartCutscene(name) => self.start_cutscene(&name, assets),
                RoomEffect::RoomCleared { room } => self.clear_room(room, events),
            }
        }
    }

    fn update_object_state(
        &mut self,
        room: usize,
        object_id: u32,
        apply: impl FnOnce(&mut ObjectState),
    ) {
        match self.dungeon.room_mut(room) {
            Ok(room) => apply(room.object_state_mut(object_id)),
            Err(error) => warn!(object = object_id, error = %error, "object_state_unavailable"),
        }
    }

    fn teleport(&mut self, target: &TeleportTarget, events: &mut EventBus, assets: &dyn AssetProvider) {
        let Some(index) = self.dungeon.find_room_by_tilemap(&target.map) else {
            warn!(map = %target.map, "teleport_target_missing");
            return;
        };
        if let Err(error) = self.dungeon.set_current_room(index) {
            warn!(map = %target.map, error = %error, "teleport_failed");
            return;
        }
        info!(room = index, map = %target.map, "teleported");
        self.load_room(events, assets);
        if let Some(player) = self.world.get_mut(self.player) {
            player.velocity = Vec2::ZERO;
            player.set_position(target.position);
        }
    }

    fn start_cutscene(&mut self, name: &str, assets: &dyn AssetProvider) {
        let position = self
            .world
            .get(self.player)
            .map_or(Vec2::ZERO, Entity::position);
        let Some(commands) = demo_content::cutscene(name, assets, self.player, position) else {
            warn!(cutscene = name, "cutscene_unknown");
            return;
        };
        for command in commands {
            self.cutscene.push_boxed(command);
        }
        info!(cutscene = name, "cutscene_started");
    }

    fn clear_room(&mut self, room: usize, events: &mut EventBus) {
        match self.dungeon.advance_room_state(room) {
            Ok(state) => {
                info!(room, state, "room_cleared");
                events.publish(
                    keys::NOTICE,
                    EventPayload::Text("The room falls quiet.".to_string()),
                );
            }
            Err(error) => warn!(room, error = %error, "room_clear_failed"),
        }
    }

    /// Moves to the neighbouring room when the player's center leaves the
    /// bounds. Without a neighbour the player is pushed back inside.
    fn check_room_exit(&mut self, events: &mut EventBus, assets: &dyn AssetProvider) {
        let Some(center) = self.world.get(self.player).map(Entity::center) else {
            return;
        };
        let Some(direction) = exited_edge(self.room_bounds, center) else {
            return;
        };
        let from = self.dungeon.current_room_index();
        match self.dungeon.step(direction) {
            Ok(to) => {
                info!(from, to, direction = direction.as_token(), "room_transition");
                self.load_room(events, assets);
                let bounds = self.room_bounds;
                if let Some(player) = self.world.get_mut(self.player) {
                    let entry = entry_position(direction, player.position(), player.rect(), bounds);
                    player.set_position(entry);
                }
            }
            Err(error) => {
                debug!(room = from, error = %error, "room_edge_blocked");
                let bounds = self.room_bounds;
                if let Some(player) = self.world.get_mut(self.player) {
                    clamp_inside(player, bounds);
                }
            }
        }
    }

    fn count_enemies(&mut self) {
        let alive = self
            .world
            .entities()
            .iter()
            .filter(|entity| {
                entity.flags.enemy && entity.is_alive() && !entity.is_marked_for_deletion()
            })
            .count();
        self.enemies_alive.set(alive);
    }

    fn follow_player(&mut self) {
        if let Some(center) = self.world.get(self.player).map(Entity::center) {
            self.camera.follow(center, self.viewport, self.room_bounds);
        }
    }

    /// Publishes player vitals and the inventory line when they change.
    fn publish_hud_state(&mut self, events: &mut EventBus) {
        if let Some(player) = self.world.get(self.player) {
            let vitals = (player.health, player.max_health);
            if self.published_vitals != Some(vitals) {
                events.publish(keys::PLAYER_HEALTH, EventPayload::Number(vitals.0 as f32));
                events.publish(keys::PLAYER_MAX_HEALTH, EventPayload::Number(vitals.1 as f32));
                self.published_vitals = Some(vitals);
            }
        }
        let summary = inventory_summary(&self.inventory);
        if self.published_inventory.as_deref() != Some(summary.as_str()) {
            events.publish(INVENTORY_TEXT_KEY, EventPayload::Text(summary.clone()));
            self.published_inventory = Some(summary);
        }
    }
}

fn subscribe_effect(
    events: &mut EventBus,
    listener_keys: &mut Vec<String>,
    effects: &EffectQueue,
    key: String,
    make: impl Fn(&EventPayload) -> Option<RoomEffect> + 'static,
) {
    let effects = Rc::clone(effects);
    events.subscribe(&key, move |_, payload| {
        if let Some(effect) = make(payload) {
            effects.borrow_mut().push(effect);
        }
    });
    listener_keys.push(key);
}

/// Publishes `ROOM_CLEARED` once the room loaded as `generation` has no
/// living enemies. Leaving the room retires the condition silently.
fn schedule_room_clear(
    events: &mut EventBus,
    room_generation: &Rc<Cell<u64>>,
    enemies_alive: &Rc<Cell<usize>>,
    room: usize,
    generation: u64,
) {
    let watched_generation = Rc::clone(room_generation);
    let watched_enemies = Rc::clone(enemies_alive);
    let fired_generation = Rc::clone(room_generation);
    events.schedule_conditional(
        move |_| watched_generation.get() != generation || watched_enemies.get() == 0,
        move |events| {
            if fired_generation.get() == generation {
                events.publish(keys::ROOM_CLEARED, EventPayload::Number(room as f32));
            }
        },
    );
}
