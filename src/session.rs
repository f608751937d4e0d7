//! 游戏会话：引擎加上它独占的 1Hz 计时任务。
//!
//! 计时任务由 `TickScheduler` 创建，丢弃即取消。回调只持有引擎的 `Weak`
//! 引用，会话销毁后残留的回调不会再修改状态；重置之后到达的 tick 由引擎
//! 自身的状态判断忽略。

use gloo_timers::callback::Interval;
use std::cell::{Ref, RefCell};
use std::rc::{Rc, Weak};

use crate::config::SessionConfig;
use crate::game::{
    CardId, GameEngine, GameEvent, GameResolution, GameSnapshot, GameStatus, ImageRef,
    RuleError,
};
use crate::images::ImageSource;
use crate::utils;

/// 周期任务调度器。返回的任务对象被丢弃时必须停止回调。
pub trait TickScheduler {
    type Task;

    fn every(&self, interval_ms: u32, callback: Box<dyn FnMut()>) -> Self::Task;
}

/// 浏览器 `setInterval`，`Interval` 在 drop 时自动 `clearInterval`。
#[derive(Debug, Default, Clone, Copy)]
pub struct IntervalScheduler;

impl TickScheduler for IntervalScheduler {
    type Task = Interval;

    fn every(&self, interval_ms: u32, mut callback: Box<dyn FnMut()>) -> Self::Task {
        Interval::new(interval_ms, move || callback())
    }
}

pub struct GameSession<S: TickScheduler> {
    ticker: Option<S::Task>,
    engine: Rc<RefCell<GameEngine>>,
    scheduler: S,
    config: SessionConfig,
}

impl<S: TickScheduler> GameSession<S> {
    pub fn new(engine: GameEngine, scheduler: S, config: SessionConfig) -> Self {
        Self {
            ticker: None,
            engine: Rc::new(RefCell::new(engine)),
            scheduler,
            config,
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn engine(&self) -> Ref<'_, GameEngine> {
        self.engine.borrow()
    }

    /// 供延迟回调使用的弱引用。
    pub fn handle(&self) -> Weak<RefCell<GameEngine>> {
        Rc::downgrade(&self.engine)
    }

    pub fn is_ticking(&self) -> bool {
        self.ticker.is_some()
    }

    pub fn snapshot(&self) -> GameSnapshot {
        self.engine.borrow().snapshot()
    }

    pub fn resolution(&self, events: Vec<GameEvent>) -> GameResolution {
        GameResolution::new(self.engine.borrow().state(), events)
    }

    pub fn start(&mut self, images: &[ImageRef]) -> Result<Vec<GameEvent>, RuleError> {
        let events = self.engine.borrow_mut().start(images)?;
        self.restart_ticker();
        Ok(events)
    }

    pub fn start_with(&mut self, source: &ImageSource) -> Result<Vec<GameEvent>, RuleError> {
        let images = source.resolve()?;
        self.start(&images)
    }

    pub fn select_card(&mut self, card_id: CardId) -> Vec<GameEvent> {
        let events = self.engine.borrow_mut().select_card(card_id);
        self.sync_ticker();
        events
    }

    pub fn clear_selection(&mut self) -> Vec<GameEvent> {
        self.engine.borrow_mut().clear_selection()
    }

    /// 由宿主自行驱动计时时调用。
    pub fn tick(&mut self) -> bool {
        self.engine.borrow_mut().tick()
    }

    pub fn reset(&mut self) -> Vec<GameEvent> {
        self.ticker = None;
        self.engine.borrow_mut().reset()
    }

    fn restart_ticker(&mut self) {
        self.ticker = None;
        let engine = self.handle();
        let task = self.scheduler.every(
            self.config.tick_interval_ms,
            Box::new(move || tick_engine(&engine)),
        );
        self.ticker = Some(task);
    }

    fn sync_ticker(&mut self) {
        if self.ticker.is_some() && self.engine.borrow().status() != GameStatus::Active {
            self.ticker = None;
        }
    }
}

fn tick_engine(engine: &Weak<RefCell<GameEngine>>) {
    let Some(engine) = engine.upgrade() else {
        utils::warn("tick ignored: game session was dropped");
        return;
    };
    match engine.try_borrow_mut() {
        Ok(mut engine) => {
            engine.tick();
        }
        Err(_) => utils::warn("tick skipped: engine busy"),
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;
    use std::collections::HashMap;

    struct ScheduledTick {
        interval_ms: u32,
        active: Rc<Cell<bool>>,
        callback: Box<dyn FnMut()>,
    }

    struct ManualTask {
        active: Rc<Cell<bool>>,
    }

    impl Drop for ManualTask {
        fn drop(&mut self) {
            self.active.set(false);
        }
    }

    #[derive(Default, Clone)]
    struct ManualScheduler {
        ticks: Rc<RefCell<Vec<ScheduledTick>>>,
    }

    impl ManualScheduler {
        fn fire(&self) {
            for tick in self.ticks.borrow_mut().iter_mut() {
                if tick.active.get() {
                    (tick.callback)();
                }
            }
        }

        // 模拟取消与回调之间的竞争：连已取消的回调也执行。
        fn fire_stale(&self) {
            for tick in self.ticks.borrow_mut().iter_mut() {
                (tick.callback)();
            }
        }

        fn scheduled(&self) -> usize {
            self.ticks.borrow().len()
        }

        fn active(&self) -> usize {
            self.ticks
                .borrow()
                .iter()
                .filter(|tick| tick.active.get())
                .count()
        }
    }

    impl TickScheduler for ManualScheduler {
        type Task = ManualTask;

        fn every(&self, interval_ms: u32, callback: Box<dyn FnMut()>) -> Self::Task {
            let active = Rc::new(Cell::new(true));
            self.ticks.borrow_mut().push(ScheduledTick {
                interval_ms,
                active: Rc::clone(&active),
                callback,
            });
            ManualTask { active }
        }
    }

    fn images(names: &[&str]) -> Vec<ImageRef> {
        names.iter().map(|name| (*name).to_owned()).collect()
    }

    fn session() -> (GameSession<ManualScheduler>, ManualScheduler) {
        let scheduler = ManualScheduler::default();
        let session = GameSession::new(
            GameEngine::with_seed(5),
            scheduler.clone(),
            SessionConfig::default(),
        );
        (session, scheduler)
    }

    fn pairs(session: &GameSession<ManualScheduler>) -> HashMap<String, Vec<CardId>> {
        let mut map: HashMap<String, Vec<CardId>> = HashMap::new();
        for card in &session.engine().state().cards {
            map.entry(card.image_ref.clone()).or_default().push(card.id);
        }
        map
    }

    #[test]
    fn start_schedules_one_second_ticker() {
        let (mut session, scheduler) = session();
        session
            .start(&images(&["a", "b", "c", "d"]))
            .expect("start should succeed");

        assert!(session.is_ticking());
        assert_eq!(scheduler.active(), 1);
        assert_eq!(scheduler.ticks.borrow()[0].interval_ms, 1_000);

        scheduler.fire();
        scheduler.fire();
        assert_eq!(session.snapshot().elapsed_seconds, 2);
    }

    #[test]
    fn reset_cancels_ticker_and_late_ticks_are_ignored() {
        let (mut session, scheduler) = session();
        session
            .start(&images(&["a", "b", "c", "d"]))
            .expect("start should succeed");
        scheduler.fire();

        session.reset();
        assert!(!session.is_ticking());
        assert_eq!(scheduler.active(), 0);

        scheduler.fire();
        scheduler.fire_stale();
        assert_eq!(session.snapshot().elapsed_seconds, 0);
        assert_eq!(session.snapshot().status, GameStatus::NotStarted);
    }

    #[test]
    fn restart_replaces_previous_ticker() {
        let (mut session, scheduler) = session();
        let set = images(&["a", "b", "c", "d"]);
        session.start(&set).expect("first start");
        session.start(&set).expect("second start");

        assert_eq!(scheduler.scheduled(), 2);
        assert_eq!(scheduler.active(), 1);

        scheduler.fire();
        assert_eq!(session.snapshot().elapsed_seconds, 1);
    }

    #[test]
    fn rejected_start_keeps_running_ticker() {
        let (mut session, scheduler) = session();
        session
            .start(&images(&["a", "b", "c", "d"]))
            .expect("start should succeed");

        let error = session
            .start(&images(&["x", "y", "z"]))
            .expect_err("three images should be rejected");
        assert!(matches!(error, RuleError::InsufficientImages { .. }));
        assert_eq!(scheduler.scheduled(), 1);
        assert_eq!(scheduler.active(), 1);
        assert_eq!(session.snapshot().total_pairs, 4);
    }

    #[test]
    fn completion_cancels_ticker() {
        let (mut session, scheduler) = session();
        session
            .start(&images(&["a", "b", "c", "d"]))
            .expect("start should succeed");
        scheduler.fire();

        for ids in pairs(&session).values() {
            session.select_card(ids[0]);
            session.select_card(ids[1]);
        }

        assert_eq!(session.snapshot().status, GameStatus::Completed);
        assert!(!session.is_ticking());
        assert_eq!(scheduler.active(), 0);

        scheduler.fire_stale();
        assert_eq!(session.snapshot().elapsed_seconds, 1);
    }

    #[test]
    fn mismatch_keeps_ticker_running() {
        let (mut session, scheduler) = session();
        session
            .start(&images(&["a", "b", "c", "d"]))
            .expect("start should succeed");
        let pairs = pairs(&session);

        session.select_card(pairs["a"][0]);
        session.select_card(pairs["b"][0]);
        assert!(session.is_ticking());

        session.clear_selection();
        assert!(session.snapshot().selected.is_empty());
        assert_eq!(scheduler.active(), 1);
    }

    #[test]
    fn ticks_after_session_drop_do_nothing() {
        let (mut session, scheduler) = session();
        session
            .start(&images(&["a", "b", "c", "d"]))
            .expect("start should succeed");
        let handle = session.handle();

        drop(session);
        assert!(handle.upgrade().is_none());
        assert_eq!(scheduler.active(), 0);

        scheduler.fire_stale();
    }

    #[test]
    fn start_with_custom_source_truncates_to_eight_pairs() {
        let (mut session, _scheduler) = session();
        let custom: Vec<ImageRef> = (0..9).map(|index| format!("blob:{index}")).collect();
        session
            .start_with(&ImageSource::custom(custom))
            .expect("custom source should start");

        assert_eq!(session.snapshot().cards.len(), 16);
    }

    #[test]
    fn start_with_bundled_source_uses_sixteen_cards() {
        let (mut session, _scheduler) = session();
        session
            .start_with(&ImageSource::bundled(""))
            .expect("bundled source should start");

        let snapshot = session.snapshot();
        assert_eq!(snapshot.cards.len(), 16);
        assert!(snapshot
            .cards
            .iter()
            .all(|card| card.image_ref.starts_with("/images/")));
    }
}
