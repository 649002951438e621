use super::{PostLength, Tone};

/// Template text for every `(tone, length)` pair
#[inline]
pub fn template(tone: Tone, length: PostLength) -> &'static str {
    match (length, tone) {
        (PostLength::Short, Tone::Emotional) => {
            "❤️ {title} taught me lessons I will never forget.\n{context}"
        }
        (PostLength::Short, Tone::Funny) => {
            "😄 {title}… we all ignore it until it's gone 😅\n{context}"
        }
        (PostLength::Short, Tone::Motivational) => "🔥 {title} is the key to success.\n{context}",
        (PostLength::Short, Tone::Professional) => {
            "💼 {title} is important in the professional world.\n{context}"
        }

        (PostLength::Medium, Tone::Emotional) => concat!(
            "❤️ **{title}**\n\n",
            "There was a moment I underestimated *{topic}*.\n",
            "{context}\n",
            "Growth happens quietly, behind the scenes. Keep pushing forward."
        ),
        (PostLength::Medium, Tone::Funny) => concat!(
            "😄 **{title}**\n\n",
            "Nobody talks enough about *{topic}*… until it disappears 😅\n",
            "{context}\n",
            "Patience and persistence beat instant gratification every time."
        ),
        (PostLength::Medium, Tone::Motivational) => concat!(
            "🔥 **{title}**\n\n",
            "Success isn’t accidental. *{topic}* makes all the difference.\n",
            "{context}\n",
            "Small consistent efforts compound into great results."
        ),
        (PostLength::Medium, Tone::Professional) => concat!(
            "💼 **{title}**\n\n",
            "In today’s competitive landscape, *{topic}* is a differentiator.\n",
            "{context}\n",
            "Consistency and learning drive sustainable growth."
        ),

        (PostLength::Long, Tone::Emotional) => concat!(
            "❤️ **{title}**\n\n",
            "There was a time I underestimated the power of *{topic}*.\n",
            "{context}\n",
            "Growth isn’t loud. It’s quiet, consistent, and deeply personal.\n",
            "Every lesson stays with you long after the noise fades.\n",
            "Keep going. ❤️"
        ),
        (PostLength::Long, Tone::Funny) => concat!(
            "😄 **{title}**\n\n",
            "Nobody talks enough about *{topic}*… until it disappears 😅\n",
            "{context}\n",
            "Success needs patience, practice, and fewer excuses.\n",
            "Show up, even when motivation disappears."
        ),
        (PostLength::Long, Tone::Motivational) => concat!(
            "🔥 **{title}**\n\n",
            "Success doesn’t happen by accident. *{topic}* builds it.\n",
            "{context}\n",
            "Every small step matters. Every effort compounds.\n",
            "Stay focused and disciplined.\n",
            "Your future self will thank you. 🚀"
        ),
        (PostLength::Long, Tone::Professional) => concat!(
            "💼 **{title}**\n\n",
            "In today’s professional world, *{topic}* is critical.\n",
            "{context}\n",
            "Sustainable success comes from deliberate effort, continuous learning, and consistency."
        ),
    }
}
