/*!

This is the long-form manual for `survey_core` and `surveytab`.

## Surveys

A survey is described in JSON. Question types are `single_choice`,
`multi_choice`, `dropdown_choice`, `ranked_choice`, `short_text`,
`long_text` and `multi_text`.

```json
{
  "id": "lunch-2024",
  "title": "Team lunch",
  "questions": [
    { "id": "q1", "prompt": "Did you join?", "type": "single_choice",
      "options": ["Yes", "No"], "sortOrder": 0,
      "conditionalLogic": { "Yes": "q3", "No": "q2" } },
    { "id": "q2", "prompt": "Why not?", "type": "short_text", "sortOrder": 1 },
    { "id": "q3", "prompt": "What did you eat?", "type": "multi_choice",
      "options": ["Rice", "Noodles", "Bread"], "sortOrder": 2, "maxSelected": 2 }
  ]
}
```

`conditionalLogic` maps an option to the question shown next when that option
is picked. A choice question with branches must be answered before the
questions after it are shown. For multiple choices, only the first selected
option is considered.

## Stored answers

Each answer is stored as one string:

| Type | Stored as |
|------|-----------|
| `single_choice`, `dropdown_choice` | the option |
| `multi_choice` | the options in selection order, separated by `,` |
| `ranked_choice` | the rank positions, `1,2,3` for three ranked options |
| `short_text`, `long_text` | the text, trimmed |
| `multi_text` | the lines, separated by `,` |

Ranked choices do not record which option received which rank. Reports only
show how many responses ranked something and how many options were ranked in
total.

## Response files

`surveytab` reads responses in the following formats:

### `json`

An array of responses:

```json
[
  { "id": "r1", "surveyId": "lunch-2024", "employeeId": "e-001",
    "submittedAt": "2024-03-01T12:30:00Z",
    "answers": { "q1": "Yes", "q3": "Rice,Bread" } }
]
```

### `csv`

One line per stored answer, with a header line:

```text
responseId,surveyId,employeeId,submittedAt,questionId,answerText
r1,lunch-2024,e-001,2024-03-01T12:30:00Z,q1,Yes
r1,lunch-2024,e-001,2024-03-01T12:30:00Z,q3,"Rice,Bread"
```

### `xlsx`

One row per response. The first row is the header: `responseId`,
`employeeId`, `submittedAt`, followed by one column per question id. Empty
cells are unanswered questions.

## Running a report

```bash
surveytab --config lunch_config.json --out stdout
```

The configuration file points to the survey and to the response files:

```json
{
  "outputSettings": { "reportName": "Lunch 2024" },
  "survey": { "id": "lunch-2024", "title": "Team lunch", "questions": [] },
  "responseSources": [ { "provider": "csv", "filePath": "answers.csv" } ]
}
```

With `--answers answers.json` (an object from question id to a string or a
list of strings), `surveytab` prints the questions a respondent would see
instead of a report.

*/
