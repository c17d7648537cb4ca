impl Scene for GameplayScene {
    fn startup(&mut self, ctx: &mut SceneContext<'_>) {
        self.subscribe_scene_listeners(ctx.events);
        self.player = self.spawn_player(ctx.assets);
        self.load_room(ctx.events, ctx.assets);
        self.world.apply_pending();
        self.follow_player();
        self.publish_hud_state(ctx.events);
    }

    fn update(&mut self, dt_seconds: f32, ctx: &mut SceneContext<'_>) {
        self.handle_persistence_requests(ctx.events, ctx.assets);
        self.interaction.tick(dt_seconds);

        // A running cutscene owns the input; gameplay sees an idle pad.
        let cutscene_running = self.cutscene.is_active();
        if cutscene_running {
            let mut command_ctx = CommandContext {
                dt_seconds,
                world: &mut self.world,
                events: &mut *ctx.events,
                input: ctx.input,
                camera: &mut self.camera,
            };
            self.cutscene.update(&mut command_ctx);
        }
        let input = if cutscene_running {
            InputSnapshot::empty()
        } else {
            *ctx.input
        };

        if input.just_pressed(InputAction::Cancel) && !self.interaction.textbox_open {
            ctx.requests.start(PAUSE_SCENE);
            ctx.requests.set_paused(GAMEPLAY_SCENE, true);
            debug!("gameplay_paused");
            return;
        }

        self.steer_player(&input, ctx.assets);
        self.run_behaviors(dt_seconds, &input, ctx.events);
        self.integrate(dt_seconds, ctx.assets);
        self.resolve_contacts(ctx.events, ctx.assets);
        self.finish_deaths(ctx.assets);
        self.world.apply_pending();
        self.drain_effects(ctx.events, ctx.assets);
        self.check_room_exit(ctx.events, ctx.assets);
        self.world.apply_pending();
        self.count_enemies();
        if !self.cutscene.is_active() {
            self.follow_player();
        }
        self.publish_hud_state(ctx.events);
    }

    fn draw(&self, renderer: &mut dyn Renderer, _events: &EventBus) {
        if let Some(tilemap) = &self.tilemap {
            tilemap.draw(renderer, &self.camera);
        }

        let mut visible: Vec<&Entity> = self
            .world
            .entities()
            .iter()
            .filter(|entity| !entity.is_marked_for_deletion())
            .collect();
        visible.sort_by_key(|entity| (entity.draw_layer, entity.rect().bottom()));
        for entity in visible {
            if entity.flags.visible && !entity.texture.is_empty() {
                renderer.submit(sprite_command(entity, &self.camera));
            }
            for behavior in &entity.behaviors {
                behavior.draw(renderer, &self.camera);
            }
        }

        if self.dungeon.current_room().is_ok_and(|room| room.dark) {
            let shade = Rect::new(
                0,
                0,
                self.viewport.width as i32,
                self.viewport.height as i32,
            );
            renderer.fill(shade, DARK_ROOM_SHADE);
        }
        self.cutscene.draw(renderer, self.viewport);
    }

    fn teardown(&mut self, ctx: &mut SceneContext<'_>) {
        self.unsubscribe_all(ctx.events);
        // Retires any pending room-clear condition.
        self.room_generation.set(self.room_generation.get() + 1);
        self.effects.borrow_mut().clear();
        self.cutscene.clear();
        self.interaction.reset();
        self.world.clear();
        self.weapon = None;
        info!(
            room = self.dungeon.current_room_index(),
            "gameplay_torn_down"
        );
    }
}
