pub mod config;
pub mod game;
pub mod images;
pub mod session;
pub mod utils;

use gloo_timers::future::TimeoutFuture;
use serde_wasm_bindgen::{from_value, to_value};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;
use web_sys::js_sys::Promise;

pub use config::SessionConfig;
pub use game::{
    Card, CardId, CardView, GameEngine, GameEvent, GameResolution, GameSnapshot, GameState,
    GameStatus, ImageRef, IntegrityError, RuleError, MATCH_POINTS, MAX_PAIRS, MIN_PAIRS,
};
pub use images::ImageSource;
pub use session::{GameSession, IntervalScheduler, TickScheduler};
pub use utils::format_time;

#[cfg(feature = "wee_alloc")]
#[global_allocator]
static ALLOC: wee_alloc::WeeAlloc = wee_alloc::WeeAlloc::INIT;

#[wasm_bindgen(start)]
pub fn start() {
    set_panic_hook();
}

fn to_js_error(error: RuleError) -> JsValue {
    to_value(&error).unwrap_or_else(|serialize_err| JsValue::from_str(&serialize_err.to_string()))
}

fn serde_to_js_error<E: std::fmt::Display>(error: E) -> JsValue {
    JsValue::from_str(&error.to_string())
}

fn make_resolution_json(resolution: GameResolution) -> Result<String, JsValue> {
    serde_json::to_string(&resolution).map_err(serde_to_js_error)
}

/// 浏览器端的记忆翻牌游戏，内部持有引擎和计时器。
#[wasm_bindgen]
pub struct MemoryGame {
    session: GameSession<IntervalScheduler>,
}

#[wasm_bindgen]
impl MemoryGame {
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: Option<String>) -> Result<MemoryGame, JsValue> {
        let config = match config_json {
            Some(json) => SessionConfig::from_json(&json).map_err(serde_to_js_error)?,
            None => SessionConfig::default(),
        };
        Ok(MemoryGame {
            session: GameSession::new(GameEngine::new(), IntervalScheduler, config),
        })
    }

    pub fn start_with_default_images(&mut self) -> Result<String, JsValue> {
        let source = ImageSource::bundled(self.session.config().base_path.clone());
        self.start_with(source)
    }

    /// `images` 为图片 URL 数组（例如 `URL.createObjectURL` 的结果）。
    pub fn start_with_custom_images(&mut self, images: JsValue) -> Result<String, JsValue> {
        let images: Vec<ImageRef> = from_value(images).map_err(JsValue::from)?;
        self.start_with(ImageSource::custom(images))
    }

    pub fn select_card(&mut self, card_id: CardId) -> Result<String, JsValue> {
        let events = self.session.select_card(card_id);
        make_resolution_json(self.session.resolution(events))
    }

    pub fn clear_selection(&mut self) -> Result<String, JsValue> {
        let events = self.session.clear_selection();
        make_resolution_json(self.session.resolution(events))
    }

    /// 延迟后翻回当前未配对的两张牌。期间若重新开局、重置或已换成另一组牌，则什么也不做。
    pub fn clear_selection_after(&self, delay_ms: Option<u32>) -> Promise {
        let engine = self.session.handle();
        let (epoch, pair) = {
            let current = self.session.engine();
            (current.epoch(), current.state().selected_pair())
        };
        let delay = delay_ms.unwrap_or(self.session.config().reveal_delay_ms);

        future_to_promise(async move {
            if delay > 0 {
                TimeoutFuture::new(delay).await;
            }
            let (Some(engine), Some(pair)) = (engine.upgrade(), pair) else {
                return Ok(JsValue::NULL);
            };
            let json = {
                let mut guard = engine.try_borrow_mut().map_err(serde_to_js_error)?;
                if guard.epoch() != epoch {
                    return Ok(JsValue::NULL);
                }
                let events = guard.clear_selection_if(pair);
                make_resolution_json(GameResolution::new(guard.state(), events))?
            };
            Ok(JsValue::from_str(&json))
        })
    }

    pub fn tick(&mut self) -> bool {
        self.session.tick()
    }

    pub fn reset(&mut self) -> Result<String, JsValue> {
        let events = self.session.reset();
        make_resolution_json(self.session.resolution(events))
    }

    pub fn is_ticking(&self) -> bool {
        self.session.is_ticking()
    }

    pub fn snapshot(&self) -> Result<JsValue, JsValue> {
        to_value(&self.session.snapshot()).map_err(JsValue::from)
    }

    pub fn snapshot_json(&self) -> Result<String, JsValue> {
        serde_json::to_string(&self.session.snapshot()).map_err(serde_to_js_error)
    }

    pub fn validate(&self) -> Result<(), JsValue> {
        self.session.engine().ensure_integrity().map_err(to_js_error)
    }

    fn start_with(&mut self, source: ImageSource) -> Result<String, JsValue> {
        let events = self.session.start_with(&source).map_err(to_js_error)?;
        make_resolution_json(self.session.resolution(events))
    }
}

/// 将秒数格式化为 `MM:SS`。
#[wasm_bindgen(js_name = "formatTime")]
pub fn format_time_js(seconds: u32) -> String {
    format_time(seconds)
}

/// 返回内置图片的完整路径列表。
#[wasm_bindgen(js_name = "bundledImages")]
pub fn bundled_images(base_path: &str) -> Result<JsValue, JsValue> {
    to_value(&images::bundled_images(base_path)).map_err(JsValue::from)
}

/// 校验前端持有的状态是否满足全部不变量。
#[wasm_bindgen(js_name = "validateState")]
pub fn validate_state(state: JsValue) -> Result<(), JsValue> {
    let state: GameState = from_value(state).map_err(JsValue::from)?;
    state
        .integrity_check()
        .map_err(|error| to_js_error(RuleError::IntegrityViolation { error }))
}

#[cfg(feature = "console_error_panic_hook")]
fn set_panic_hook() {
    console_error_panic_hook::set_once();
}

#[cfg(not(feature = "console_error_panic_hook"))]
fn set_panic_hook() {}
