//! Demonstration posts present for every identity
//!
//! The catalog is the synthetic zero-th partition owned by
//! [`Identity::catalog`](partition_store::Identity::catalog). It is never
//! written back as a partition of its own; counters and comment threads are
//! layered on top at load time.

use super::models::{AuthorRef, Comment, MediaItem, Post, Reply};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;

struct SeedReply {
    id: &'static str,
    text: &'static str,
    author: &'static str,
    avatar: u32,
    minutes_ago: i64,
    likes: u32,
}

struct SeedComment {
    id: &'static str,
    text: &'static str,
    author: &'static str,
    avatar: u32,
    minutes_ago: i64,
    likes: u32,
    replies: &'static [SeedReply],
}

struct SeedPost {
    n: u32,
    title: &'static str,
    content: &'static str,
    author: &'static str,
    avatar: u32,
    tags: &'static [&'static str],
    location: &'static str,
    likes: u32,
    saves: u32,
    age_ms: i64,
    comments: &'static [SeedComment],
}

const fn comment(
    id: &'static str,
    text: &'static str,
    author: &'static str,
    avatar: u32,
    minutes_ago: i64,
) -> SeedComment {
    SeedComment {
        id,
        text,
        author,
        avatar,
        minutes_ago,
        likes: 0,
        replies: &[],
    }
}

const HOUR: i64 = 60;
const DAY: i64 = 24 * HOUR;

const DEMO_POSTS: &[SeedPost] = &[
    SeedPost {
        n: 1,
        title: "Amazing VRChat World Discovery",
        content: "Found this incredible world in VRChat today! The attention to detail is absolutely stunning.",
        author: "VR Explorer",
        avatar: 10,
        tags: &["VRChat", "WorldDiscovery", "Amazing"],
        location: "Crystal Caverns",
        likes: 42,
        saves: 18,
        age_ms: 3_600_000,
        comments: &[SeedComment {
            id: "comment-1",
            text: "This world looks amazing! What's the name? 😍",
            author: "CuriousUser",
            avatar: 11,
            minutes_ago: 2 * HOUR,
            likes: 3,
            replies: &[
                SeedReply {
                    id: "reply-1-1",
                    text: "It's called \"Crystal Caverns\" - you can find it in the fantasy worlds section! ✨",
                    author: "VR Explorer",
                    avatar: 10,
                    minutes_ago: HOUR,
                    likes: 2,
                },
                SeedReply {
                    id: "reply-1-2",
                    text: "Thanks for sharing! Going to check it out right now 🚀",
                    author: "WorldHunter",
                    avatar: 35,
                    minutes_ago: 45,
                    likes: 1,
                },
            ],
        }],
    },
    SeedPost {
        n: 2,
        title: "VRChat Avatar Showcase",
        content: "Check out my new custom avatar! Spent weeks working on the design and animations.",
        author: "Avatar Artist",
        avatar: 12,
        tags: &["Avatar", "Custom", "Art"],
        location: "Avatar World",
        likes: 89,
        saves: 34,
        age_ms: 7_200_000,
        comments: &[],
    },
    SeedPost {
        n: 3,
        title: "Virtual Concert Experience",
        content: "What an incredible virtual concert! The community in VRChat never ceases to amaze me.",
        author: "Music Lover",
        avatar: 13,
        tags: &["Concert", "Music", "Community"],
        location: "Virtual Stage",
        likes: 156,
        saves: 67,
        age_ms: 86_400_000,
        comments: &[SeedComment {
            id: "comment-2",
            text: "I was there too! Amazing performance! 🎵🎤",
            author: "ConcertGoer",
            avatar: 14,
            minutes_ago: DAY,
            likes: 8,
            replies: &[SeedReply {
                id: "reply-2-1",
                text: "The bass drop was insane! My headset almost fell off 😂",
                author: "BassHead",
                avatar: 36,
                minutes_ago: 20 * HOUR,
                likes: 5,
            }],
        }],
    },
    SeedPost {
        n: 4,
        title: "Cyberpunk Neon City Adventure",
        content: "Exploring the neon-lit streets of this cyberpunk world was an incredible experience! The lighting effects are phenomenal.",
        author: "Cyber Tourist",
        avatar: 15,
        tags: &["Cyberpunk", "Neon", "City", "Aesthetic"],
        location: "Neo Tokyo",
        likes: 234,
        saves: 89,
        age_ms: 10_800_000,
        comments: &[comment(
            "comment-3",
            "The atmosphere in this world is incredible!",
            "NeonFan",
            16,
            3 * HOUR,
        )],
    },
    SeedPost {
        n: 5,
        title: "Cozy Café Hangout Session",
        content: "Spent the afternoon at this adorable virtual café with friends. Perfect place to relax and chat!",
        author: "Café Lover",
        avatar: 17,
        tags: &["Café", "Cozy", "Friends", "Relaxing"],
        location: "Virtual Café",
        likes: 67,
        saves: 23,
        age_ms: 14_400_000,
        comments: &[],
    },
    SeedPost {
        n: 6,
        title: "Epic Fantasy Castle Tour",
        content: "This medieval fantasy world has the most detailed castle I've ever seen in VRChat. The architecture is breathtaking!",
        author: "Fantasy Explorer",
        avatar: 18,
        tags: &["Fantasy", "Castle", "Medieval", "Architecture"],
        location: "Dragon's Keep",
        likes: 178,
        saves: 56,
        age_ms: 18_000_000,
        comments: &[
            comment(
                "comment-4",
                "I love the attention to detail in the stonework!",
                "ArchitectFan",
                19,
                5 * HOUR,
            ),
            comment(
                "comment-5",
                "Been looking for a good medieval world, thanks for sharing!",
                "KnightRP",
                20,
                4 * HOUR,
            ),
        ],
    },
    SeedPost {
        n: 7,
        title: "Underwater Ocean Paradise",
        content: "Swimming with virtual dolphins and exploring coral reefs - this underwater world is absolutely magical!",
        author: "Ocean Dreamer",
        avatar: 21,
        tags: &["Ocean", "Underwater", "Marine", "Peaceful"],
        location: "Coral Paradise",
        likes: 145,
        saves: 78,
        age_ms: 21_600_000,
        comments: &[comment(
            "comment-6",
            "The water physics in this world are amazing!",
            "DivingEnthusiast",
            22,
            6 * HOUR,
        )],
    },
    SeedPost {
        n: 8,
        title: "Space Station Zero-G Fun",
        content: "Floating around in zero gravity never gets old! This space station world has incredible physics simulation.",
        author: "Space Cadet",
        avatar: 23,
        tags: &["Space", "ZeroGravity", "Station", "Physics"],
        location: "Orbital Station Alpha",
        likes: 298,
        saves: 134,
        age_ms: 28_800_000,
        comments: &[
            comment(
                "comment-7",
                "The zero-G mechanics are so well done here!",
                "AstronautRP",
                24,
                8 * HOUR,
            ),
            comment(
                "comment-8",
                "Perfect for space roleplay sessions!",
                "SciFiFan",
                25,
                7 * HOUR,
            ),
        ],
    },
    SeedPost {
        n: 9,
        title: "Magical Forest Gathering",
        content: "Found this enchanted forest where magical creatures roam freely. The lighting effects through the trees are stunning!",
        author: "Forest Wanderer",
        avatar: 26,
        tags: &["Magic", "Forest", "Nature", "Fantasy"],
        location: "Whispering Woods",
        likes: 189,
        saves: 92,
        age_ms: 108_000_000,
        comments: &[comment(
            "comment-9",
            "I love the ambient sounds in this world!",
            "NatureLover",
            27,
            DAY,
        )],
    },
    SeedPost {
        n: 10,
        title: "Retro 80s Arcade Night",
        content: "Throwback to the 80s in this amazing retro arcade world! All the classic games are here and fully playable.",
        author: "Retro Gamer",
        avatar: 28,
        tags: &["Retro", "80s", "Arcade", "Gaming"],
        location: "Neon Arcade",
        likes: 267,
        saves: 156,
        age_ms: 43_200_000,
        comments: &[
            SeedComment {
                id: "comment-10",
                text: "Playing Pac-Man in VR hits different! 👾🕹️",
                author: "ArcadeFan",
                avatar: 29,
                minutes_ago: 12 * HOUR,
                likes: 15,
                replies: &[
                    SeedReply {
                        id: "reply-10-1",
                        text: "Right?! And the 3D maze perspective is mind-blowing 🤯",
                        author: "RetroGamer",
                        avatar: 28,
                        minutes_ago: 11 * HOUR,
                        likes: 7,
                    },
                    SeedReply {
                        id: "reply-10-2",
                        text: "Wait until you try Space Invaders in there! 🚀👽",
                        author: "ClassicGamer",
                        avatar: 37,
                        minutes_ago: 9 * HOUR,
                        likes: 4,
                    },
                ],
            },
            SeedComment {
                id: "comment-11",
                text: "The synthwave music really completes the vibe! 🎶💜",
                author: "SynthwaveFan",
                avatar: 30,
                minutes_ago: 10 * HOUR,
                likes: 12,
                replies: &[SeedReply {
                    id: "reply-11-1",
                    text: "The lighting effects sync perfectly with the beats too! 🌈✨",
                    author: "VisualFX_Pro",
                    avatar: 38,
                    minutes_ago: 8 * HOUR,
                    likes: 6,
                }],
            },
        ],
    },
    SeedPost {
        n: 11,
        title: "Japanese Garden Meditation",
        content: "This peaceful Japanese garden is perfect for meditation and quiet reflection. The zen atmosphere is incredible.",
        author: "Zen Seeker",
        avatar: 31,
        tags: &["Japanese", "Garden", "Meditation", "Peaceful"],
        location: "Sakura Gardens",
        likes: 134,
        saves: 89,
        age_ms: 172_800_000,
        comments: &[comment(
            "comment-12",
            "I come here whenever I need to relax and unwind.",
            "MindfulUser",
            32,
            2 * DAY,
        )],
    },
    SeedPost {
        n: 12,
        title: "Halloween Horror House",
        content: "Bravely explored this spooky horror house with friends. Perfect for Halloween season - genuinely scary!",
        author: "Horror Enthusiast",
        avatar: 33,
        tags: &["Horror", "Halloween", "Scary", "Friends"],
        location: "Haunted Manor",
        likes: 223,
        saves: 67,
        age_ms: 259_200_000,
        comments: &[
            comment(
                "comment-13",
                "I screamed so loud my neighbors complained!",
                "ScaredyCat",
                34,
                DAY,
            ),
            comment(
                "comment-14",
                "The jump scares in this world are expertly timed.",
                "HorrorCritic",
                35,
                18 * HOUR,
            ),
        ],
    },
];

fn comment_author(name: &str, avatar: u32) -> AuthorRef {
    AuthorRef {
        id: None,
        name: name.to_string(),
        avatar: format!("https://picsum.photos/32/32?random={}", avatar),
    }
}

impl SeedPost {
    fn materialise(&self, anchor: DateTime<Utc>) -> Post {
        let minutes_ago = |m: i64| anchor - Duration::minutes(m);

        Post {
            id: format!("demo-{}", self.n),
            title: self.title.to_string(),
            content: self.content.to_string(),
            media: vec![MediaItem::image(format!(
                "https://picsum.photos/400/500?random={}",
                self.n
            ))],
            author: AuthorRef {
                id: Some(format!("demo-user-{}", self.n)),
                name: self.author.to_string(),
                avatar: format!("https://picsum.photos/40/40?random={}", self.avatar),
            },
            tags: self.tags.iter().map(|t| t.to_string()).collect(),
            location: self.location.to_string(),
            likes_count: self.likes,
            saves_count: self.saves,
            comments: self
                .comments
                .iter()
                .map(|c| Comment {
                    id: c.id.to_string(),
                    text: c.text.to_string(),
                    author: comment_author(c.author, c.avatar),
                    timestamp: minutes_ago(c.minutes_ago),
                    likes_count: c.likes,
                    replies: c
                        .replies
                        .iter()
                        .map(|r| Reply {
                            id: r.id.to_string(),
                            text: r.text.to_string(),
                            author: comment_author(r.author, r.avatar),
                            timestamp: minutes_ago(r.minutes_ago),
                            likes_count: r.likes,
                        })
                        .collect(),
                })
                .collect(),
            created_at: anchor - Duration::milliseconds(self.age_ms),
            is_private: false,
            is_draft: false,
        }
    }
}

/// Read-only set of catalog posts, indexed by id
#[derive(Debug, Clone, Default)]
pub struct SeedCatalog {
    posts: Vec<Post>,
    index: HashMap<String, usize>,
}

impl SeedCatalog {
    /// The twelve demonstration posts, aged relative to `anchor`
    pub fn demo(anchor: DateTime<Utc>) -> Self {
        Self::from_posts(DEMO_POSTS.iter().map(|p| p.materialise(anchor)).collect())
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn from_posts(posts: Vec<Post>) -> Self {
        let index = posts
            .iter()
            .enumerate()
            .map(|(i, p)| (p.id.clone(), i))
            .collect();
        Self { posts, index }
    }

    pub fn contains(&self, post_id: &str) -> bool {
        self.index.contains_key(post_id)
    }

    pub fn get(&self, post_id: &str) -> Option<&Post> {
        self.index.get(post_id).map(|&i| &self.posts[i])
    }

    pub fn posts(&self) -> &[Post] {
        &self.posts
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }
}
