//! The host's button, exposed as `./Button`.
use std::sync::Arc;

use federation::Component;
use serde::Deserialize;
use serde_json::Value;
use ui_runtime::{Element, UiRuntime};

const BASE: &str =
    "flex text-xs group flex-row gap-x-2 items-center justify-center disabled:!bg-gray-800";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ButtonType {
    #[default]
    Primary,
    Secondary,
    Error,
    Warning,
    Success,
    Info,
    Default,
}

impl ButtonType {
    fn classes(self) -> &'static str {
        match self {
            ButtonType::Primary => "bg-blue-500 text-white hover:bg-blue-600",
            ButtonType::Secondary => "bg-black text-white hover:bg-gray-300",
            ButtonType::Error => "bg-red-600 text-white hover:bg-red-700",
            ButtonType::Warning => "bg-yellow-500 text-white hover:bg-yellow-600",
            ButtonType::Success => "bg-green-500 text-white hover:bg-green-600",
            ButtonType::Info => "bg-sky-200 text-black hover:bg-sky-300",
            ButtonType::Default => "bg-gray-400 text-white hover:bg-gray-500",
        }
    }
}

/// Size steps shared by `size` and `padding`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Scale {
    #[default]
    Default,
    Sm,
    Lg,
    Xl,
    Xxl,
}

impl Scale {
    fn size_classes(self) -> &'static str {
        match self {
            Scale::Default => "h-[38px]",
            Scale::Sm => "h-8 !w-8",
            Scale::Lg => "h-12",
            Scale::Xl => "h-14",
            Scale::Xxl => "h-16",
        }
    }

    fn padding_classes(self) -> &'static str {
        match self {
            Scale::Default => "px-5 py-2",
            Scale::Sm => "px-3 py-2",
            Scale::Lg => "px-5 py-3",
            Scale::Xl => "px-5 py-4",
            Scale::Xxl => "px-5 py-5",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Rounded {
    #[default]
    Default,
    Sm,
    Lg,
    Xl,
    Xxl,
    None,
    Full,
}

impl Rounded {
    fn classes(self) -> &'static str {
        match self {
            Rounded::Default | Rounded::Lg => "rounded-lg",
            Rounded::Sm => "rounded-sm",
            Rounded::Xl => "rounded-xl",
            Rounded::Xxl => "rounded-2xl",
            Rounded::None => "rounded-none",
            Rounded::Full => "rounded-full",
        }
    }
}

/// Props accepted by [`Button`]. Absent or `null` fields take their defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct ButtonProps {
    pub label: Option<String>,
    pub button_type: Option<ButtonType>,
    pub size: Option<Scale>,
    pub padding: Option<Scale>,
    pub rounded: Option<Rounded>,
    pub is_full_width: Option<bool>,
    pub class_name: Option<String>,
    pub button_wrapper_class_name: Option<String>,
}

impl ButtonProps {
    /// Class list of the inner `<button>`.
    pub fn class_list(&self) -> String {
        let width = if self.is_full_width.unwrap_or(false) {
            "!w-full"
        } else {
            "w-auto"
        };
        [
            self.class_name.as_deref().unwrap_or_default(),
            BASE,
            self.button_type.unwrap_or_default().classes(),
            self.size.unwrap_or_default().size_classes(),
            self.padding.unwrap_or_default().padding_classes(),
            self.rounded.unwrap_or_default().classes(),
            width,
        ]
        .iter()
        .filter(|class| !class.is_empty())
        .copied()
        .collect::<Vec<_>>()
        .join(" ")
    }
}

/// Button rendered through the shared UI runtime.
pub struct Button {
    runtime: Arc<UiRuntime>,
}

impl Button {
    pub fn new(runtime: Arc<UiRuntime>) -> Self {
        Self { runtime }
    }

    pub fn element(props: &ButtonProps) -> Element {
        let mut button = Element::new("button")
            .class(props.class_list())
            .attr("type", "button");
        if let Some(label) = props.label.as_deref().filter(|label| !label.is_empty()) {
            button = button.child(Element::new("label").class("cursor-pointer").text(label));
        }
        Element::new("div")
            .class(props.button_wrapper_class_name.as_deref().unwrap_or_default())
            .child(button)
    }
}

impl Component for Button {
    fn render(&self, props: &Value) -> String {
        let props = ButtonProps::deserialize(props).unwrap_or_else(|err| {
            tracing::warn!("Button props rejected, using defaults: {}", err);
            ButtonProps::default()
        });
        self.runtime.render(&Button::element(&props))
    }
}
