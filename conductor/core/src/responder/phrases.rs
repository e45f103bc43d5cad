//! Fixed vocabulary of the simulated assistant.

/// Opening phrases, one of which starts every reply
pub const OPENINGS: [&str; 10] = [
    "That's a really interesting question! Let me think about that for a moment...",
    "I understand what you're asking. Here's what I think about that topic:",
    "Great question! Based on what you've shared, I'd say:",
    "Thanks for sharing that with me. My perspective on this is:",
    "I appreciate you asking! From my understanding:",
    "That's something I find fascinating too. Here's my take:",
    "Absolutely! I've been thinking about similar things lately. I believe:",
    "That reminds me of something important. I think the key point is:",
    "You've touched on something really valuable there. In my view:",
    "I'm glad you brought that up! My thoughts are:",
];

/// Topic remarks, one of which ends every reply
pub const TOPICS: [&str; 10] = [
    "Technology is constantly evolving, and it's amazing how it shapes our daily lives.",
    "The human experience is incredibly rich and complex, filled with unique perspectives.",
    "Learning is a lifelong journey that opens up so many possibilities.",
    "Creativity and problem-solving go hand in hand in the most beautiful ways.",
    "Connection and communication are fundamental to who we are as beings.",
    "The world around us is full of patterns and systems worth exploring.",
    "Every question leads to new discoveries and deeper understanding.",
    "Balance and mindfulness can make such a difference in our approach to challenges.",
    "Innovation often comes from asking the right questions at the right time.",
    "There's always more than one way to look at any situation or problem.",
];
