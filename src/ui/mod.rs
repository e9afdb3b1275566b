pub mod actions;
pub mod settings_panel;

pub use actions::{PanelAction, PluginActions};
pub use settings_panel::{
    ActionButton, ControlKind, ControlValue, DropdownOption, PanelEntry, SettingControl,
    SettingsPanel,
};
