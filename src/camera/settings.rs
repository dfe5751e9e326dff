use crate::error::CameraError;
use serde::{Deserialize, Serialize};

/// A named sensor tuning register with a validated range
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorSetting {
    Brightness,
    Contrast,
    Saturation,
    SpecialEffect,
    WhiteBalance,
    AwbGain,
    WbMode,
    ExposureCtrl,
    Aec2,
    AeLevel,
    AecValue,
    GainCtrl,
    AgcGain,
    GainCeiling,
    Bpc,
    Wpc,
    RawGma,
    Lenc,
    HMirror,
    VFlip,
    Dcw,
    Colorbar,
}

impl SensorSetting {
    /// Every setting, in the order it is written to the sensor
    pub const ALL: [SensorSetting; 22] = [
        SensorSetting::Brightness,
        SensorSetting::Contrast,
        SensorSetting::Saturation,
        SensorSetting::SpecialEffect,
        SensorSetting::WhiteBalance,
        SensorSetting::AwbGain,
        SensorSetting::WbMode,
        SensorSetting::ExposureCtrl,
        SensorSetting::Aec2,
        SensorSetting::AeLevel,
        SensorSetting::AecValue,
        SensorSetting::GainCtrl,
        SensorSetting::AgcGain,
        SensorSetting::GainCeiling,
        SensorSetting::Bpc,
        SensorSetting::Wpc,
        SensorSetting::RawGma,
        SensorSetting::Lenc,
        SensorSetting::HMirror,
        SensorSetting::VFlip,
        SensorSetting::Dcw,
        SensorSetting::Colorbar,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            SensorSetting::Brightness => "brightness",
            SensorSetting::Contrast => "contrast",
            SensorSetting::Saturation => "saturation",
            SensorSetting::SpecialEffect => "special_effect",
            SensorSetting::WhiteBalance => "whitebal",
            SensorSetting::AwbGain => "awb_gain",
            SensorSetting::WbMode => "wb_mode",
            SensorSetting::ExposureCtrl => "exposure_ctrl",
            SensorSetting::Aec2 => "aec2",
            SensorSetting::AeLevel => "ae_level",
            SensorSetting::AecValue => "aec_value",
            SensorSetting::GainCtrl => "gain_ctrl",
            SensorSetting::AgcGain => "agc_gain",
            SensorSetting::GainCeiling => "gainceiling",
            SensorSetting::Bpc => "bpc",
            SensorSetting::Wpc => "wpc",
            SensorSetting::RawGma => "raw_gma",
            SensorSetting::Lenc => "lenc",
            SensorSetting::HMirror => "hmirror",
            SensorSetting::VFlip => "vflip",
            SensorSetting::Dcw => "dcw",
            SensorSetting::Colorbar => "colorbar",
        }
    }

    /// Inclusive range accepted by the sensor
    pub fn range(&self) -> (i32, i32) {
        match self {
            SensorSetting::Brightness
            | SensorSetting::Contrast
            | SensorSetting::Saturation
            | SensorSetting::AeLevel => (-2, 2),
            // none, negative, grayscale, red, green, blue, sepia
            SensorSetting::SpecialEffect => (0, 6),
            // auto, sunny, cloudy, office, home
            SensorSetting::WbMode => (0, 4),
            SensorSetting::AecValue => (0, 1200),
            SensorSetting::AgcGain => (0, 30),
            SensorSetting::GainCeiling => (0, 6),
            _ => (0, 1),
        }
    }

    /// Reject values outside the sensor range
    pub fn check(&self, value: i32) -> Result<(), CameraError> {
        let (min, max) = self.range();
        if (min..=max).contains(&value) {
            Ok(())
        } else {
            Err(CameraError::InvalidSetting {
                setting: self.name(),
                value,
                min,
                max,
            })
        }
    }
}

/// Tuning values applied once after the sensor is configured
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorTuning {
    pub brightness: i32,
    pub contrast: i32,
    pub saturation: i32,
    pub special_effect: i32,
    pub whitebal: i32,
    pub awb_gain: i32,
    pub wb_mode: i32,
    pub exposure_ctrl: i32,
    pub aec2: i32,
    pub ae_level: i32,
    pub aec_value: i32,
    pub gain_ctrl: i32,
    pub agc_gain: i32,
    pub gainceiling: i32,
    pub bpc: i32,
    pub wpc: i32,
    pub raw_gma: i32,
    pub lenc: i32,
    pub hmirror: i32,
    pub vflip: i32,
    pub dcw: i32,
    pub colorbar: i32,
}

impl SensorTuning {
    pub fn value(&self, setting: SensorSetting) -> i32 {
        match setting {
            SensorSetting::Brightness => self.brightness,
            SensorSetting::Contrast => self.contrast,
            SensorSetting::Saturation => self.saturation,
            SensorSetting::SpecialEffect => self.special_effect,
            SensorSetting::WhiteBalance => self.whitebal,
            SensorSetting::AwbGain => self.awb_gain,
            SensorSetting::WbMode => self.wb_mode,
            SensorSetting::ExposureCtrl => self.exposure_ctrl,
            SensorSetting::Aec2 => self.aec2,
            SensorSetting::AeLevel => self.ae_level,
            SensorSetting::AecValue => self.aec_value,
            SensorSetting::GainCtrl => self.gain_ctrl,
            SensorSetting::AgcGain => self.agc_gain,
            SensorSetting::GainCeiling => self.gainceiling,
            SensorSetting::Bpc => self.bpc,
            SensorSetting::Wpc => self.wpc,
            SensorSetting::RawGma => self.raw_gma,
            SensorSetting::Lenc => self.lenc,
            SensorSetting::HMirror => self.hmirror,
            SensorSetting::VFlip => self.vflip,
            SensorSetting::Dcw => self.dcw,
            SensorSetting::Colorbar => self.colorbar,
        }
    }

    /// Settings paired with their values, in application order
    pub fn settings(&self) -> impl Iterator<Item = (SensorSetting, i32)> + '_ {
        SensorSetting::ALL
            .iter()
            .map(move |setting| (*setting, self.value(*setting)))
    }

    pub fn validate(&self) -> Result<(), CameraError> {
        for (setting, value) in self.settings() {
            setting.check(value)?;
        }
        Ok(())
    }
}

impl Default for SensorTuning {
    fn default() -> Self {
        Self {
            brightness: 0,
            contrast: 0,
            saturation: 0,
            special_effect: 0,
            whitebal: 1,
            awb_gain: 1,
            wb_mode: 0,
            exposure_ctrl: 1,
            aec2: 0,
            ae_level: 0,
            aec_value: 300,
            gain_ctrl: 1,
            agc_gain: 0,
            gainceiling: 0,
            bpc: 0,
            wpc: 1,
            raw_gma: 1,
            lenc: 1,
            hmirror: 0,
            vflip: 0,
            dcw: 1,
            colorbar: 0,
        }
    }
}
