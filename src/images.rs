//! 图片来源：内置图片集或用户上传的图片。

use serde::{Deserialize, Serialize};

use crate::game::{deck, ImageRef, RuleError};

/// 内置图片文件名，位于 `{base_path}/images/` 下。
pub const BUNDLED_IMAGE_NAMES: [&str; 10] = [
    "euonymus-europaeus-8353310_1280.jpg",
    "fruit-8773085_1280.jpg",
    "grapes-5889697_1280.jpg",
    "healthy-5146826_1280.jpg",
    "onions-1397037_1280.jpg",
    "pumpkin-1637320_1280.jpg",
    "raspberries-7313700_1280.jpg",
    "salad-2756467_1280.jpg",
    "tomato-5011851_1280.jpg",
    "vegetable-market-337971_1280.jpg",
];

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum ImageSource {
    Bundled { base_path: String },
    Custom { images: Vec<ImageRef> },
}

impl ImageSource {
    pub fn bundled(base_path: impl Into<String>) -> Self {
        Self::Bundled {
            base_path: base_path.into(),
        }
    }

    pub fn custom(images: Vec<ImageRef>) -> Self {
        Self::Custom { images }
    }

    /// 解析出传给引擎的图片列表。自定义图片先去重，不足 4 张时报错，多于 8 张时截断。
    pub fn resolve(&self) -> Result<Vec<ImageRef>, RuleError> {
        match self {
            ImageSource::Bundled { base_path } => Ok(bundled_images(base_path)),
            ImageSource::Custom { images } => deck::select_images(images),
        }
    }
}

pub fn image_path(base_path: &str, name: &str) -> ImageRef {
    format!("{}/images/{}", base_path.trim_end_matches('/'), name)
}

pub fn bundled_images(base_path: &str) -> Vec<ImageRef> {
    BUNDLED_IMAGE_NAMES
        .iter()
        .map(|name| image_path(base_path, name))
        .collect()
}
