use anyhow::{bail, Result};
use serde::{Deserialize, Serialize};

use crate::issue::IssueId;

pub const DIGIT_COUNT: u8 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Size {
    Small,
    Big,
}

impl Size {
    pub fn opposite(&self) -> Size {
        match self {
            Size::Small => Size::Big,
            Size::Big => Size::Small,
        }
    }

    /// Chiffres couverts par la taille, dans l'ordre croissant.
    pub fn digits(&self) -> [u8; 5] {
        match self {
            Size::Small => [0, 1, 2, 3, 4],
            Size::Big => [5, 6, 7, 8, 9],
        }
    }

    pub fn contains(&self, digit: u8) -> bool {
        size_of(digit) == *self
    }
}

impl std::fmt::Display for Size {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Size::Small => write!(f, "Small"),
            Size::Big => write!(f, "Big"),
        }
    }
}

/// Couleur simple (sans la marque violette).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Color {
    Red,
    Green,
}

impl Color {
    pub fn opposite(&self) -> Color {
        match self {
            Color::Red => Color::Green,
            Color::Green => Color::Red,
        }
    }

    /// Chiffres de la couleur : les chiffres simples d'abord, puis le chiffre double (0 ou 5).
    pub fn digits(&self) -> [u8; 5] {
        match self {
            Color::Red => [2, 4, 6, 8, 0],
            Color::Green => [1, 3, 7, 9, 5],
        }
    }

    pub fn contains(&self, digit: u8) -> bool {
        color_of(digit).base() == *self
    }
}

impl std::fmt::Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Color::Red => write!(f, "Red"),
            Color::Green => write!(f, "Green"),
        }
    }
}

/// Couleur d'un tirage, avec les deux cas doubles 0 (rouge + violet) et 5 (vert + violet).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DrawColor {
    Red,
    Green,
    RedViolet,
    GreenViolet,
}

impl DrawColor {
    pub fn base(&self) -> Color {
        match self {
            DrawColor::Red | DrawColor::RedViolet => Color::Red,
            DrawColor::Green | DrawColor::GreenViolet => Color::Green,
        }
    }

    pub fn is_violet(&self) -> bool {
        matches!(self, DrawColor::RedViolet | DrawColor::GreenViolet)
    }
}

impl std::fmt::Display for DrawColor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DrawColor::Red => write!(f, "Red"),
            DrawColor::Green => write!(f, "Green"),
            DrawColor::RedViolet => write!(f, "Red+Violet"),
            DrawColor::GreenViolet => write!(f, "Green+Violet"),
        }
    }
}

pub fn size_of(digit: u8) -> Size {
    assert!(digit < DIGIT_COUNT, "chiffre hors domaine : {digit}");
    if digit <= 4 {
        Size::Small
    } else {
        Size::Big
    }
}

pub fn color_of(digit: u8) -> DrawColor {
    assert!(digit < DIGIT_COUNT, "chiffre hors domaine : {digit}");
    match digit {
        0 => DrawColor::RedViolet,
        5 => DrawColor::GreenViolet,
        d if d % 2 == 0 => DrawColor::Red,
        _ => DrawColor::Green,
    }
}

pub fn is_violet_digit(digit: u8) -> bool {
    digit == 0 || digit == 5
}

/// Un tirage observé. `number` est toujours dans 0..=9.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DrawRecord {
    pub issue: IssueId,
    pub number: u8,
}

impl DrawRecord {
    pub fn new(issue: IssueId, number: u8) -> Result<Self> {
        validate_digit(number)?;
        Ok(Self { issue, number })
    }

    pub fn size(&self) -> Size {
        size_of(self.number)
    }

    pub fn color(&self) -> DrawColor {
        color_of(self.number)
    }
}

pub fn validate_digit(number: u8) -> Result<()> {
    if number >= DIGIT_COUNT {
        bail!("Numéro {} hors limites (0-9)", number);
    }
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PredictionKind {
    Color,
    Size,
    Number,
}

impl std::fmt::Display for PredictionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionKind::Color => write!(f, "Color"),
            PredictionKind::Size => write!(f, "Size"),
            PredictionKind::Number => write!(f, "Number"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PredictionValue {
    Color(Color),
    Size(Size),
    Number(u8),
}

impl PredictionValue {
    pub fn kind(&self) -> PredictionKind {
        match self {
            PredictionValue::Color(_) => PredictionKind::Color,
            PredictionValue::Size(_) => PredictionKind::Size,
            PredictionValue::Number(_) => PredictionKind::Number,
        }
    }

    /// Valeur opposée (Big/Small, Red/Green). Un chiffre reste inchangé.
    pub fn reversed(&self) -> PredictionValue {
        match self {
            PredictionValue::Color(color) => PredictionValue::Color(color.opposite()),
            PredictionValue::Size(size) => PredictionValue::Size(size.opposite()),
            PredictionValue::Number(digit) => PredictionValue::Number(*digit),
        }
    }

    /// Une prédiction couleur ignore la marque violette du tirage.
    pub fn matches(&self, draw: &DrawRecord) -> bool {
        match self {
            PredictionValue::Color(color) => draw.color().base() == *color,
            PredictionValue::Size(size) => draw.size() == *size,
            PredictionValue::Number(digit) => draw.number == *digit,
        }
    }
}

impl std::fmt::Display for PredictionValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PredictionValue::Color(c) => write!(f, "{c}"),
            PredictionValue::Size(s) => write!(f, "{s}"),
            PredictionValue::Number(n) => write!(f, "{n}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Outcome {
    Win,
    Loss,
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Outcome::Win => write!(f, "WIN"),
            Outcome::Loss => write!(f, "LOSS"),
        }
    }
}
