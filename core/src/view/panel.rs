//! The hero panel: a guide for visitors or the trainer roster.

use crate::types::{Trainer, User};

pub const GUIDE_HEADING: &str = "Your Personalized Path to Success!";
pub const TRAINERS_HEADING: &str = "Meet Our Expert Trainers";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Panel {
    #[default]
    Guide,
    Trainers,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    pub label: &'static str,
    pub href: &'static str,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PanelView {
    Guide(GuideView),
    Trainers(TrainersView),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GuideView {
    pub heading: &'static str,
    pub actions: Vec<Link>,
}

impl GuideView {
    /// Signed-in users get a single call to action; visitors get sign-up
    /// and login.
    pub fn new(user: Option<&User>) -> Self {
        let actions = if user.is_some() {
            vec![Link {
                label: "Start your journey!",
                href: "/newclient",
            }]
        } else {
            vec![
                Link {
                    label: "Sign up!",
                    href: "/signup",
                },
                Link {
                    label: "Login!",
                    href: "/login",
                },
            ]
        };
        Self {
            heading: GUIDE_HEADING,
            actions,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrainersView {
    pub heading: &'static str,
    pub trainers: Vec<TrainerCard>,
}

impl TrainersView {
    pub fn new(trainers: &[Trainer]) -> Self {
        Self {
            heading: TRAINERS_HEADING,
            trainers: trainers.iter().map(TrainerCard::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrainerCard {
    pub user_name: String,
    pub email: String,
    pub full_name: String,
    pub avatar_url: Option<String>,
    /// Shown when the avatar image is missing.
    pub avatar_fallback: String,
    pub client_count: usize,
}

impl From<&Trainer> for TrainerCard {
    fn from(trainer: &Trainer) -> Self {
        let full_name = format!("{} {}", trainer.first_name, trainer.last_name)
            .trim()
            .to_string();
        Self {
            user_name: trainer.user_name.clone(),
            email: trainer.email.clone(),
            full_name,
            avatar_url: trainer.profile_image.clone().filter(|url| !url.is_empty()),
            avatar_fallback: trainer
                .user_name
                .chars()
                .next()
                .map(String::from)
                .unwrap_or_default(),
            client_count: trainer.clients.len(),
        }
    }
}
